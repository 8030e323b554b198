use assert2::assert;
use packed_struct::{PackedStruct, PackedStructSlice};

use crate::align::padding_to_align;
use crate::crc32;
use crate::structs::{DosDatetime, PackedStructZipletExt};
use crate::{structs, Error};

/// Bookkeeping for a single archive entry, kept from [`Writer::start_file`]
/// until the entry's central directory record has been written.
#[derive(Clone, Debug)]
struct FileEntry<'a> {
    name: &'a str,
    /// Offset of the entry's local header (first mention in the output) in the archive
    offset: u64,
    datetime: DosDatetime,
    /// Content bytes reported so far, the total size once the entry is closed
    size: u64,
    /// Length of the zero filled extra field that aligns the content,
    /// fixed when the local header is written
    extra_field_len: u16,
    /// Running CRC-32 of the content
    crc32: u32,
}

#[derive(Clone, Copy, Debug, Default)]
enum State {
    /// No entry is open and the central directory was not started.
    #[default]
    Between,
    /// A local header was written and content is being fed.
    EntryOpen { entry_index: usize },
    /// Central directory records are being written, `next_index` points at
    /// the next entry to visit.
    CentralDirectory { next_index: usize },
    /// The end of central directory record was written.
    Finished,
}

/// Incrementally encodes a ZIP archive into caller provided buffers.
///
/// The writer performs no I/O and stores no content. Each call encodes one
/// framing record into the provided buffer and returns how many bytes were
/// written, the caller appends those bytes to its output stream. Content
/// bytes are appended by the caller directly and only reported to the writer
/// through [`Writer::file_data`], so memory usage stays constant regardless
/// of entry sizes, apart from one small bookkeeping record per entry.
///
/// The call sequence for an archive:
/// 1. For every file [`Writer::start_file`], any number of
///    [`Writer::file_data`] calls, then [`Writer::end_file`].
/// 2. [`Writer::central_directory_entry`] repeatedly until it returns 0.
/// 3. [`Writer::central_directory_end`].
///
/// Out of sequence calls return an error and leave the writer and the buffer
/// unchanged.
///
/// Entries are always stored uncompressed and all sizes and offsets are
/// encoded as 32 bit values. Archives that would need ZIP64 (over 4 GiB of
/// data or 65535 entries) are not detected, the values get silently
/// truncated.
#[derive(Clone, Debug)]
pub struct Writer<'a> {
    /// Number of archive bytes produced so far, including content reported
    /// through [`Writer::file_data`]
    length: u64,
    entries: Vec<FileEntry<'a>>,
    state: State,
    /// Offset of the start of the central directory, valid once the first
    /// central directory record was requested
    cd_offset: u64,
    /// Total size of the central directory records written so far
    cd_size: u64,
}

impl<'a> Writer<'a> {
    /// Creates a writer for a new, empty archive.
    pub fn new() -> Self {
        Writer {
            length: 0,
            entries: Vec::new(),
            state: State::Between,
            cd_offset: 0,
            cd_size: 0,
        }
    }

    /// Drops all entries and bookkeeping so the writer can encode a new
    /// archive from scratch.
    ///
    /// This also releases the borrows of all entry names.
    pub fn reset(&mut self) {
        *self = Writer::new();
    }

    /// Buffer size sufficient for every operation of a writer that uses
    /// entry names of at most `max_name_len` bytes and alignments of at
    /// most `max_alignment`.
    pub fn buffer_size(max_name_len: usize, max_alignment: u16) -> usize {
        // The central directory header is the largest of the fixed records
        structs::CentralDirectoryHeader::packed_size_usize()
            + max_name_len
            + usize::from(max_alignment.saturating_sub(1))
    }

    /// Opens a new entry and encodes its local file header into `buf`,
    /// returning the number of bytes written.
    ///
    /// `name` is borrowed by the writer until the entry's central directory
    /// record has been written (or the writer is reset or dropped).
    ///
    /// A non zero `alignment` pads the header with a zero filled extra field
    /// so that the first content byte lands on a multiple of `alignment`
    /// in the archive. Zero disables alignment.
    ///
    /// The header leaves CRC-32 and sizes zeroed, the real values follow in
    /// the data descriptor written by [`Writer::end_file`].
    ///
    /// # Errors
    /// Will return an error if an entry is already open, if the central
    /// directory was already started, if the archive is finished, if `name`
    /// is empty or longer than `u16::MAX` (limitation of the ZIP format),
    /// or if `buf` cannot hold the whole header.
    pub fn start_file(
        &mut self,
        name: &'a str,
        datetime: DosDatetime,
        alignment: u16,
        buf: &mut [u8],
    ) -> Result<usize, Error> {
        match self.state {
            State::Between => {}
            State::EntryOpen { .. } => return Err(Error::EntryStillOpen),
            State::CentralDirectory { .. } => return Err(Error::CentralDirectoryStarted),
            State::Finished => return Err(Error::ArchiveFinished),
        }
        if name.is_empty() {
            return Err(Error::EmptyEntryName);
        }
        if u16::try_from(name.len()).is_err() {
            return Err(Error::TooLongEntryName { length: name.len() });
        }

        let offset = self.length;
        let content_offset = offset + structs::LocalFileHeader::packed_size() + name.len() as u64;
        let extra_field_len = padding_to_align(content_offset, alignment);

        let required = structs::LocalFileHeader::packed_size_usize()
            + name.len()
            + usize::from(extra_field_len);
        check_buffer(required, buf)?;

        let mut written = pack_record(
            &structs::LocalFileHeader {
                signature: structs::LocalFileHeader::SIGNATURE,
                version_to_extract: structs::VERSION_NEEDED_TO_EXTRACT,
                flags: structs::FLAG_DATA_DESCRIPTOR,
                compression: structs::Compression::Store,
                last_mod_time: datetime.time(),
                last_mod_date: datetime.date(),
                // The real CRC and sizes follow in the data descriptor
                crc32: 0,
                compressed_size: 0,
                uncompressed_size: 0,
                file_name_len: name.len() as u16,
                extra_field_len,
            },
            buf,
        );
        written += write_name_and_padding(name, extra_field_len, &mut buf[written..]);
        assert!(written == required);

        let entry_index = self.entries.len();
        self.entries.push(FileEntry {
            name,
            offset,
            datetime,
            size: 0,
            extra_field_len,
            crc32: crc32::CRC32_INIT,
        });
        self.state = State::EntryOpen { entry_index };
        self.length += written as u64;

        Ok(written)
    }

    /// Reports one chunk of content of the open entry.
    ///
    /// The writer only updates the CRC and size bookkeeping, the chunk
    /// itself has to be appended to the output by the caller. Chunk
    /// boundaries are arbitrary and do not affect the encoded archive.
    ///
    /// # Errors
    /// Will return an error if no entry is open.
    pub fn file_data(&mut self, data: &[u8]) -> Result<(), Error> {
        let State::EntryOpen { entry_index } = self.state else {
            return Err(Error::NoEntryOpen);
        };

        let entry = &mut self.entries[entry_index];
        entry.crc32 = crc32::update(entry.crc32, data);
        entry.size += data.len() as u64;
        self.length += data.len() as u64;

        Ok(())
    }

    /// Closes the open entry and encodes its data descriptor into `buf`,
    /// returning the number of bytes written.
    ///
    /// # Errors
    /// Will return an error if no entry is open or if `buf` cannot hold the
    /// descriptor.
    pub fn end_file(&mut self, buf: &mut [u8]) -> Result<usize, Error> {
        let State::EntryOpen { entry_index } = self.state else {
            return Err(Error::NoEntryOpen);
        };

        let required = structs::DataDescriptor::packed_size_usize();
        check_buffer(required, buf)?;

        let entry = &self.entries[entry_index];
        let written = pack_record(
            &structs::DataDescriptor {
                signature: structs::DataDescriptor::SIGNATURE,
                crc32: entry.crc32,
                // Stored entries are never compressed, the sizes are equal
                compressed_size: entry.size as u32,
                uncompressed_size: entry.size as u32,
            },
            buf,
        );
        assert!(written == required);

        self.state = State::Between;
        self.length += written as u64;

        Ok(written)
    }

    /// Encodes the central directory record of the next unvisited entry into
    /// `buf` and returns the number of bytes written, or 0 once all entries
    /// have been visited.
    ///
    /// The first call starts the central directory, no more entries can be
    /// added afterwards. Exhausted calls keep returning 0 and write nothing.
    ///
    /// # Errors
    /// Will return an error if an entry is still open, if the archive is
    /// finished, or if `buf` cannot hold the record.
    pub fn central_directory_entry(&mut self, buf: &mut [u8]) -> Result<usize, Error> {
        let (next_index, first_call) = match self.state {
            State::Between => (0, true),
            State::CentralDirectory { next_index } => (next_index, false),
            State::EntryOpen { .. } => return Err(Error::EntryStillOpen),
            State::Finished => return Err(Error::ArchiveFinished),
        };

        let Some(entry) = self.entries.get(next_index) else {
            if first_call {
                // Even an exhausted first call pins down where the (empty)
                // central directory starts
                self.cd_offset = self.length;
                self.state = State::CentralDirectory { next_index };
            }
            return Ok(0);
        };

        let name = entry.name;
        let extra_field_len = entry.extra_field_len;
        let required = structs::CentralDirectoryHeader::packed_size_usize()
            + name.len()
            + usize::from(extra_field_len);
        check_buffer(required, buf)?;

        let mut written = pack_record(
            &structs::CentralDirectoryHeader {
                signature: structs::CentralDirectoryHeader::SIGNATURE,
                version_made_by: structs::VERSION_MADE_BY,
                version_to_extract: structs::VERSION_NEEDED_TO_EXTRACT,
                flags: structs::FLAG_DATA_DESCRIPTOR,
                compression: structs::Compression::Store,
                last_mod_time: entry.datetime.time(),
                last_mod_date: entry.datetime.date(),
                crc32: entry.crc32,
                compressed_size: entry.size as u32,
                uncompressed_size: entry.size as u32,
                file_name_len: name.len() as u16,
                // Mirrors the local header so both records have the same
                // size, the padding is written as plain zeros
                extra_field_len,
                file_comment_length: 0,
                disk_number_start: 0,
                internal_attributes: 0,
                external_attributes: 0,
                local_header_offset: entry.offset as u32,
            },
            buf,
        );
        written += write_name_and_padding(name, extra_field_len, &mut buf[written..]);
        assert!(written == required);

        if first_call {
            self.cd_offset = self.length;
        }
        self.state = State::CentralDirectory {
            next_index: next_index + 1,
        };
        self.cd_size += written as u64;
        self.length += written as u64;

        Ok(written)
    }

    /// Encodes the end of central directory record into `buf` and finishes
    /// the archive, returning the number of bytes written.
    ///
    /// Can be called without draining [`Writer::central_directory_entry`]
    /// first, which for an empty archive is the shortest valid call
    /// sequence. With entries present the directory records must have been
    /// written for the archive to be valid.
    ///
    /// # Errors
    /// Will return an error if an entry is still open, if the archive is
    /// already finished, or if `buf` cannot hold the record.
    pub fn central_directory_end(&mut self, buf: &mut [u8]) -> Result<usize, Error> {
        match self.state {
            State::Between | State::CentralDirectory { .. } => {}
            State::EntryOpen { .. } => return Err(Error::EntryStillOpen),
            State::Finished => return Err(Error::ArchiveFinished),
        }

        let required = structs::EndOfCentralDirectory::packed_size_usize();
        check_buffer(required, buf)?;

        let entry_count = self.entries.len() as u16;
        let written = pack_record(
            &structs::EndOfCentralDirectory {
                signature: structs::EndOfCentralDirectory::SIGNATURE,
                this_disk_number: 0,
                start_of_cd_disk_number: 0,
                this_cd_entry_count: entry_count,
                total_cd_entry_count: entry_count,
                size_of_cd: self.cd_size as u32,
                cd_offset: self.cd_offset as u32,
                file_comment_length: 0,
            },
            buf,
        );
        assert!(written == required);

        self.state = State::Finished;
        self.length += written as u64;

        Ok(written)
    }
}

impl Default for Writer<'_> {
    fn default() -> Self {
        Writer::new()
    }
}

/// Checks the output buffer capacity up front, so that a partial record is
/// never written.
fn check_buffer(required: usize, buf: &[u8]) -> Result<(), Error> {
    if buf.len() < required {
        return Err(Error::BufferTooSmall {
            required,
            available: buf.len(),
        });
    }
    Ok(())
}

/// Packs a fixed size record to the start of `buf`.
/// Capacity has been checked by the caller.
fn pack_record<P: PackedStruct>(record: &P, buf: &mut [u8]) -> usize {
    let size = P::packed_size_usize();
    record.pack_to_slice(&mut buf[..size]).unwrap_or_else(|_| {
        unreachable!("The slice is cut to the packed size, there is no other way this could fail")
    });
    size
}

/// Writes the entry name followed by the zero filled extra field that pads
/// the content to its alignment.
/// Capacity has been checked by the caller.
fn write_name_and_padding(name: &str, extra_field_len: u16, buf: &mut [u8]) -> usize {
    let bytes = name.as_bytes();
    buf[..bytes.len()].copy_from_slice(bytes);

    let end = bytes.len() + usize::from(extra_field_len);
    buf[bytes.len()..end].fill(0);

    end
}
