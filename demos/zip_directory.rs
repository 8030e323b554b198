use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use clap::Parser;
use ziplet::{DosDatetime, Writer};

#[derive(Parser)]
#[command(about, long_about = None)]
struct Args {
    // Source directory
    source_dir: PathBuf,
    // Destination zipfile
    output: PathBuf,
    /// Align the content of every entry to a multiple of this value
    #[arg(long, default_value_t = 0)]
    alignment: u16,
}

fn main() -> std::io::Result<()> {
    let args = Args::parse();

    let files = gather_files(&args.source_dir)?;
    let max_name_len = files.iter().map(|(name, _)| name.len()).max().unwrap_or(0);

    let mut writer = Writer::new();
    let mut buf = vec![0u8; Writer::buffer_size(max_name_len, args.alignment)];
    let mut chunk = vec![0u8; 64 * 1024];
    let mut output = File::create(&args.output)?;

    for (name, path) in &files {
        let mut file = File::open(path)?;
        let datetime = modification_datetime(&file)?;

        let n = writer.start_file(name, datetime, args.alignment, &mut buf)?;
        output.write_all(&buf[..n])?;

        loop {
            let read = file.read(&mut chunk)?;
            if read == 0 {
                break;
            }
            writer.file_data(&chunk[..read])?;
            output.write_all(&chunk[..read])?;
        }

        let n = writer.end_file(&mut buf)?;
        output.write_all(&buf[..n])?;
    }

    loop {
        let n = writer.central_directory_entry(&mut buf)?;
        if n == 0 {
            break;
        }
        output.write_all(&buf[..n])?;
    }

    let n = writer.central_directory_end(&mut buf)?;
    output.write_all(&buf[..n])?;

    println!("Wrote {} entries to {}", files.len(), args.output.display());

    Ok(())
}

/// Walks a directory and pairs each file's archive entry name with its path.
fn gather_files(directory: &Path) -> std::io::Result<Vec<(String, PathBuf)>> {
    let mut files = Vec::new();

    for entry in walkdir::WalkDir::new(directory) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.into_path();
        let name = path
            .strip_prefix(directory)
            .unwrap()
            .to_string_lossy()
            .into_owned();

        files.push((name, path));
    }

    Ok(files)
}

/// Converts the file's modification time to the packed ZIP representation,
/// falling back to the earliest representable timestamp.
fn modification_datetime(file: &File) -> std::io::Result<DosDatetime> {
    let modified = file.metadata()?.modified()?;
    let datetime = chrono::DateTime::<chrono::Utc>::from(modified).naive_utc();

    Ok(DosDatetime::from_datetime(datetime).unwrap_or_default())
}
