//! Opening alignment inputs and outputs.
//!
//! SAM is chosen for `.sam` paths, BAM for everything else. `-` means
//! standard input or output. Standard input is sniffed for the BGZF magic;
//! standard output is always BAM.

use crate::error::HeaderError;
use noodles::sam::alignment::RecordBuf;
use noodles::sam::header::record::value::Map;
use noodles::sam::header::record::value::map::Program;
use noodles::sam::header::record::value::map::program::tag as pg_tag;
use noodles::{bam, sam};
use std::fs::File;
use std::io::{self, BufReader, BufWriter};
use std::iter;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlignmentFormat {
    Sam,
    Bam,
}

pub fn is_stdio(path: &Path) -> bool {
    path.as_os_str() == "-"
}

pub fn detect_format(path: &Path) -> AlignmentFormat {
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    match ext.as_str() {
        "sam" => AlignmentFormat::Sam,
        _ => AlignmentFormat::Bam,
    }
}

const BGZF_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Peek at the start of a stream without consuming it.
pub fn sniff_format<R: io::BufRead>(reader: &mut R) -> io::Result<AlignmentFormat> {
    let buf = reader.fill_buf()?;
    if buf.starts_with(&BGZF_MAGIC) {
        Ok(AlignmentFormat::Bam)
    } else {
        Ok(AlignmentFormat::Sam)
    }
}

type NextRecord = Box<dyn FnMut(&sam::Header, &mut RecordBuf) -> io::Result<usize>>;

/// A header plus a sequential record reader over SAM or BAM.
pub struct AlignmentInput {
    header: sam::Header,
    next: NextRecord,
}

impl AlignmentInput {
    pub fn open(path: &Path) -> crate::Result<Self> {
        if is_stdio(path) {
            tracing::debug!("opening alignment input from standard input");
            return Self::from_reader(BufReader::new(io::stdin().lock()));
        }

        let format = detect_format(path);
        tracing::debug!(path = %path.display(), ?format, "opening alignment input");
        let file = File::open(path)?;
        match format {
            AlignmentFormat::Sam => Ok(Self::from_sam(BufReader::new(file))?),
            AlignmentFormat::Bam => Ok(Self::from_bam(file)?),
        }
    }

    /// Open a stream of unknown format: BGZF compressed input is read as
    /// BAM, anything else as SAM.
    pub fn from_reader<R>(mut inner: R) -> crate::Result<Self>
    where
        R: io::BufRead + 'static,
    {
        let format = sniff_format(&mut inner)?;
        tracing::debug!(?format, "detected stream format");
        Ok(match format {
            AlignmentFormat::Bam => Self::from_bam(inner)?,
            AlignmentFormat::Sam => Self::from_sam(inner)?,
        })
    }

    pub fn from_sam<R>(inner: R) -> Result<Self, HeaderError>
    where
        R: io::BufRead + 'static,
    {
        let mut reader = sam::io::Reader::new(inner);
        let header = reader.read_header().map_err(HeaderError::Unreadable)?;
        let next: NextRecord = Box::new(move |header: &sam::Header, record: &mut RecordBuf| {
            reader.read_record_buf(header, record)
        });
        Ok(Self { header, next })
    }

    pub fn from_bam<R>(inner: R) -> Result<Self, HeaderError>
    where
        R: io::Read + 'static,
    {
        let mut reader = bam::io::Reader::new(inner);
        let header = reader.read_header().map_err(HeaderError::Unreadable)?;
        let next: NextRecord = Box::new(move |header: &sam::Header, record: &mut RecordBuf| {
            reader.read_record_buf(header, record)
        });
        Ok(Self { header, next })
    }

    pub fn header(&self) -> &sam::Header {
        &self.header
    }

    /// Records in file order. Stops at end of input; decode errors are yielded.
    pub fn records(&mut self) -> impl Iterator<Item = io::Result<RecordBuf>> + '_ {
        let header = &self.header;
        let next = &mut self.next;
        iter::from_fn(move || {
            let mut record = RecordBuf::default();
            match next(header, &mut record) {
                Ok(0) => None,
                Ok(_) => Some(Ok(record)),
                Err(e) => Some(Err(e)),
            }
        })
    }
}

pub type AlignmentWriter = Box<dyn sam::alignment::io::Write>;

pub fn create_writer(path: &Path) -> io::Result<AlignmentWriter> {
    if is_stdio(path) {
        return Ok(Box::new(bam::io::Writer::new(io::stdout().lock())));
    }
    let file = File::create(path)?;
    Ok(match detect_format(path) {
        AlignmentFormat::Sam => Box::new(sam::io::Writer::new(BufWriter::new(file))),
        AlignmentFormat::Bam => Box::new(bam::io::Writer::new(file)),
    })
}

/// Append an `@PG` line, chained after the header's last program.
///
/// A taken ID gets a numeric suffix (`id.1`, `id.2`, ...). Returns the ID used.
pub fn add_program(
    header: &mut sam::Header,
    id: &str,
    command_line: &str,
    description: &str,
) -> io::Result<String> {
    let mut pg_id = id.to_string();
    let mut n = 0;
    while header.programs().as_ref().keys().any(|k| k == pg_id.as_str()) {
        n += 1;
        pg_id = format!("{id}.{n}");
    }

    let program = Map::<Program>::builder()
        .insert(pg_tag::NAME, id)
        .insert(pg_tag::VERSION, env!("CARGO_PKG_VERSION"))
        .insert(pg_tag::COMMAND_LINE, command_line)
        .insert(pg_tag::DESCRIPTION, description)
        .build()
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
    header.programs_mut().add(pg_id.as_str(), program)?;
    Ok(pg_id)
}
