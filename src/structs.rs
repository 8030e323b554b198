use packed_struct::prelude::*;

/// Version needed to extract: ZIP spec 2.0, the minimum that understands
/// data descriptors.
pub const VERSION_NEEDED_TO_EXTRACT: u16 = 20;

/// Version made by: spec 2.0, MS-DOS compatible attribute interpretation.
pub const VERSION_MADE_BY: u16 = 20;

/// General purpose flag bit 3: CRC-32 and sizes are zero in the local header
/// and follow the data in a data descriptor.
pub const FLAG_DATA_DESCRIPTOR: u16 = 1 << 3;

/// Local file header
/// Precedes every file.
/// Must be followed by the file name and extra field (lengths are part of this struct)
#[derive(Debug, PackedStruct)]
#[packed_struct(endian = "lsb")]
pub struct LocalFileHeader {
    pub signature: u32,
    pub version_to_extract: u16,
    pub flags: u16,
    #[packed_field(size_bytes = "2", ty = "enum")]
    pub compression: Compression,
    pub last_mod_time: u16,
    pub last_mod_date: u16,
    pub crc32: u32,
    pub compressed_size: u32,
    pub uncompressed_size: u32,
    pub file_name_len: u16,
    pub extra_field_len: u16,
}

impl LocalFileHeader {
    pub const SIGNATURE: u32 = 0x04034b50;
}

/// Data descriptor
/// Follows file data, carries the CRC-32 and sizes left zeroed in the local
/// header.
#[derive(Debug, PackedStruct)]
#[packed_struct(endian = "lsb")]
pub struct DataDescriptor {
    pub signature: u32,
    pub crc32: u32,
    pub compressed_size: u32,
    pub uncompressed_size: u32,
}

impl DataDescriptor {
    pub const SIGNATURE: u32 = 0x08074b50;
}

/// Central directory header
/// One per each file, placed in central directory.
/// Must be followed by the file name and extra field, same as the local header.
#[derive(Debug, PackedStruct)]
#[packed_struct(endian = "lsb")]
pub struct CentralDirectoryHeader {
    pub signature: u32,
    pub version_made_by: u16,
    pub version_to_extract: u16,
    pub flags: u16,
    #[packed_field(size_bytes = "2", ty = "enum")]
    pub compression: Compression,
    pub last_mod_time: u16,
    pub last_mod_date: u16,
    pub crc32: u32,
    pub compressed_size: u32,
    pub uncompressed_size: u32,
    pub file_name_len: u16,
    pub extra_field_len: u16,
    pub file_comment_length: u16,
    pub disk_number_start: u16,
    pub internal_attributes: u16,
    pub external_attributes: u32,
    pub local_header_offset: u32,
}

impl CentralDirectoryHeader {
    pub const SIGNATURE: u32 = 0x02014b50;
}

#[derive(Debug, PackedStruct)]
#[packed_struct(endian = "lsb")]
pub struct EndOfCentralDirectory {
    pub signature: u32,
    pub this_disk_number: u16,
    pub start_of_cd_disk_number: u16,
    pub this_cd_entry_count: u16,
    pub total_cd_entry_count: u16,
    pub size_of_cd: u32,
    pub cd_offset: u32,
    pub file_comment_length: u16,
}

impl EndOfCentralDirectory {
    pub const SIGNATURE: u32 = 0x06054b50;
}

#[derive(Clone, Copy, Debug, PrimitiveEnum_u16)]
#[non_exhaustive]
pub enum Compression {
    Store = 0,
}

/// Last modification date and time in the MS-DOS packed format of ZIP headers.
///
/// The representable range is 1980-1-1T00:00:00 to 2107-12-31T23:59:58.
/// Note that only even seconds can be stored and the value will get rounded down.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DosDatetime {
    date: u16,
    time: u16,
}

impl DosDatetime {
    /// Packs the given calendar fields.
    ///
    /// Returns None if the date is out of the representable range (1980-1-1 to 2107-12-31)
    /// or any field is not a valid calendar value.
    pub fn new(
        year: i32,
        month: u32,
        day: u32,
        hour: u32,
        minute: u32,
        second: u32,
    ) -> Option<Self> {
        if !(1980..=2107).contains(&year) {
            return None;
        }
        if !(1..=12).contains(&month) {
            return None;
        }
        if !(1..=31).contains(&day) {
            return None;
        }
        if hour > 23 || minute > 59 || second > 59 {
            return None;
        }

        Some(DosDatetime {
            date: (((year - 1980) as u16) << 9) | ((month as u16) << 5) | (day as u16),
            time: ((hour as u16) << 11) | ((minute as u16) << 5) | ((second as u16) >> 1),
        })
    }

    #[cfg(feature = "chrono")]
    /// Packs a chrono datetime.
    ///
    /// Returns None if the date is out of the representable range (1980-1-1 to 2107-12-31)
    ///
    /// Note that only even seconds can be stored and the value will get rounded down.
    pub fn from_datetime(datetime: chrono::NaiveDateTime) -> Option<Self> {
        use chrono::{Datelike, Timelike};

        Self::new(
            datetime.year(),
            datetime.month(),
            datetime.day(),
            datetime.hour(),
            datetime.minute(),
            datetime.second(),
        )
    }

    /// Packed date half (year, month, day), as stored in the header fields.
    pub fn date(&self) -> u16 {
        self.date
    }

    /// Packed time half (hour, minute, second / 2), as stored in the header fields.
    pub fn time(&self) -> u16 {
        self.time
    }
}

impl Default for DosDatetime {
    /// 1980-1-1T00:00:00, the earliest representable timestamp.
    fn default() -> Self {
        DosDatetime {
            date: (1 << 5) | 1,
            time: 0,
        }
    }
}

pub trait PackedStructZipletExt {
    fn packed_size() -> u64;
    fn packed_size_usize() -> usize;
}

impl<T: PackedStruct> PackedStructZipletExt for T {
    fn packed_size() -> u64 {
        Self::packed_size_usize() as u64
    }

    fn packed_size_usize() -> usize {
        Self::packed_bytes_size(None).unwrap()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use assert2::assert;
    use test_case::test_case;

    #[cfg(feature = "chrono")]
    use proptest::prop_assume;
    #[cfg(feature = "chrono")]
    use test_strategy::proptest;

    /// The fixed parts of the records have well known sizes, all the buffer
    /// provisioning math relies on them.
    #[test]
    fn packed_sizes_match_wire_format() {
        assert!(LocalFileHeader::packed_size() == 30);
        assert!(DataDescriptor::packed_size() == 16);
        assert!(CentralDirectoryHeader::packed_size() == 46);
        assert!(EndOfCentralDirectory::packed_size() == 22);
    }

    #[test]
    fn datetime_packs_msdos_layout() {
        let datetime = DosDatetime::new(2000, 1, 1, 0, 0, 0).unwrap();
        assert!(datetime.date() == 0x2821);
        assert!(datetime.time() == 0);
    }

    #[test]
    fn datetime_packs_the_last_representable_instant() {
        let datetime = DosDatetime::new(2107, 12, 31, 23, 59, 58).unwrap();
        assert!(datetime.date() == 0xff9f);
        assert!(datetime.time() == 0xbf7d);
    }

    #[test]
    fn datetime_rounds_seconds_down() {
        let even = DosDatetime::new(2024, 5, 1, 12, 30, 40).unwrap();
        let odd = DosDatetime::new(2024, 5, 1, 12, 30, 41).unwrap();
        assert!(even == odd);
    }

    #[test]
    fn datetime_default_is_the_earliest_representable() {
        assert!(DosDatetime::default() == DosDatetime::new(1980, 1, 1, 0, 0, 0).unwrap());
    }

    #[test_case(1979, 1, 1, 0, 0, 0 ; "year too early")]
    #[test_case(2108, 1, 1, 0, 0, 0 ; "year too late")]
    #[test_case(2024, 0, 1, 0, 0, 0 ; "month zero")]
    #[test_case(2024, 13, 1, 0, 0, 0 ; "month too large")]
    #[test_case(2024, 1, 0, 0, 0, 0 ; "day zero")]
    #[test_case(2024, 1, 32, 0, 0, 0 ; "day too large")]
    #[test_case(2024, 1, 1, 24, 0, 0 ; "hour too large")]
    #[test_case(2024, 1, 1, 0, 60, 0 ; "minute too large")]
    #[test_case(2024, 1, 1, 0, 0, 60 ; "second too large")]
    fn datetime_out_of_range(year: i32, month: u32, day: u32, hour: u32, minute: u32, second: u32) {
        assert!(DosDatetime::new(year, month, day, hour, minute, second).is_none());
    }

    #[cfg(feature = "chrono")]
    #[proptest]
    fn datetime_chrono_matches(
        #[strategy(1980..2108)] year: i32,
        #[strategy(1u32..=12u32)] month: u32,
        #[strategy(1u32..=31u32)] day: u32,
        #[strategy(0u32..24u32)] hour: u32,
        #[strategy(0u32..60u32)] minute: u32,
        #[strategy(0u32..60u32)] second: u32,
    ) {
        let Some(chrono_datetime) = chrono::NaiveDate::from_ymd_opt(year, month, day)
            .and_then(|d| d.and_hms_opt(hour, minute, second))
        else {
            prop_assume!(false);
            unreachable!();
        };

        assert!(
            DosDatetime::from_datetime(chrono_datetime)
                == DosDatetime::new(year, month, day, hour, minute, second)
        );
    }
}
