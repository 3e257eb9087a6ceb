//! LZW Compression
//!
//! Fixed code width LZW.  The code space is laid out as follows:
//! * 0-255 are the literal bytes
//! * 256 up to `max_code()` are assigned to dictionary entries in order
//! * `max_value()`, all ones, marks the end of the stream
//!
//! The stream is followed by a zero code whose only purpose is to push out the last
//! partial byte.  Once the code space is used up the dictionary is frozen and the remaining
//! data is coded with the entries that exist.  There is no clear code.

use std::fs::File;
use std::io::{Cursor,Read,Write,BufReader,BufWriter};
use std::path::Path;
use crate::tools::bit_channel::{BitReader,BitWriter};
use crate::tools::dictionary::{self,DecodeTable,EncodeTable,Probe,FIRST_CODE};
use crate::{Error,Result};

/// Options controlling compression
#[derive(Clone,Debug,PartialEq)]
pub struct Options {
    /// width of every code in bits, 9 through 16.
    /// This is not stored in the stream, both ends must use the same value.
    pub code_width: usize
}

pub const STD_OPTIONS: Options = Options {
    code_width: 14
};

impl Options {
    /// Options with a given code width, error if the width is not supported
    pub fn with_code_width(code_width: usize) -> Result<Self> {
        match dictionary::table_size(code_width) {
            Some(_) => Ok(Self { code_width }),
            None => Err(Error::UnsupportedWidth(code_width))
        }
    }
    /// the end-of-stream code
    pub fn max_value(&self) -> usize {
        (1 << self.code_width) - 1
    }
    /// largest code that can be assigned to a dictionary entry
    pub fn max_code(&self) -> usize {
        self.max_value() - 1
    }
    /// number of slots in the encoding hash table
    pub fn table_size(&self) -> Result<usize> {
        dictionary::table_size(self.code_width).ok_or(Error::UnsupportedWidth(self.code_width))
    }
}

/// Byte counts resulting from compression or expansion
#[derive(Clone,Copy,Debug,Default,PartialEq,Eq)]
pub struct Sizes {
    pub compressed_size: u64,
    pub decompressed_size: u64
}

impl Sizes {
    /// compressed size as a percentage of decompressed size, 0 if there was no data
    pub fn ratio(&self) -> f64 {
        match self.decompressed_size {
            0 => 0.0,
            d => self.compressed_size as f64 / d as f64 * 100.0
        }
    }
}

/// Main compression function.
/// `expanded_in` is an object with the `Read` trait, usually `std::fs::File`, or `&[u8]`.
/// `compressed_out` is an object with the `Write` trait, usually `std::fs::File`, or `Vec<u8>`.
/// An empty input produces an empty output.
pub fn compress<R,W>(expanded_in: &mut R, compressed_out: &mut W, opt: &Options) -> Result<Sizes>
where R: Read, W: Write {
    let table_size = opt.table_size()?;
    let mut bytes = BufReader::new(expanded_in).bytes();
    let mut coder = BitWriter::new(BufWriter::new(compressed_out),opt.code_width);
    log::debug!("create LZW dictionary with {} slots",table_size);
    let mut lzw = EncodeTable::create(opt.code_width,table_size);

    // the code for the string matched so far
    let mut curr = match bytes.next() {
        Some(by) => by? as usize,
        None => {
            log::debug!("empty input");
            coder.finish()?;
            return Ok(Sizes::default());
        }
    };
    let mut expanded_length: u64 = 1;
    for by in bytes {
        let sym = by?;
        expanded_length += 1;
        match lzw.lookup(curr,sym) {
            Probe::Found(code) => {
                curr = code;
            },
            Probe::Vacant(slot) => {
                log::trace!("code: {}",curr);
                coder.emit(curr)?;
                if let Some(code) = lzw.insert(slot,curr,sym) {
                    log::trace!("add {} linking to {}.{}",code,curr,sym);
                    if lzw.is_full() {
                        log::debug!("dictionary is full after {} bytes",expanded_length);
                    }
                }
                curr = sym as usize;
            }
        }
    }
    log::trace!("code: {}",curr);
    coder.emit(curr)?;
    coder.emit(opt.max_value())?;
    coder.emit(0)?;
    let compressed_length = coder.finish()?;
    log::debug!("compressed {} bytes into {}, next code {}",expanded_length,compressed_length,lzw.next_code());
    Ok(Sizes {
        compressed_size: compressed_length,
        decompressed_size: expanded_length
    })
}

/// Main decompression function.
/// `compressed_in` is an object with the `Read` trait, usually `std::fs::File`, or `&[u8]`.
/// `expanded_out` is an object with the `Write` trait, usually `std::fs::File`, or `Vec<u8>`.
/// Bytes may have been written to `expanded_out` before an error is detected.
pub fn decompress<R,W>(compressed_in: &mut R, expanded_out: &mut W, opt: &Options) -> Result<Sizes>
where R: Read, W: Write {
    opt.table_size()?;
    let mut decoder = BitReader::new(BufReader::new(compressed_in),opt.code_width);
    let mut writer = BufWriter::new(expanded_out);
    let stop_code = opt.max_value();
    log::debug!("create LZW dictionary");
    let mut lzw = DecodeTable::create(opt.code_width);

    let mut prev_code = match decoder.next()? {
        None => {
            log::debug!("empty input");
            writer.flush()?;
            return Ok(Sizes::default());
        },
        Some(code) if code == stop_code => {
            log::debug!("stream has no data");
            let compressed_length = decoder.finish()?;
            writer.flush()?;
            return Ok(Sizes { compressed_size: compressed_length, decompressed_size: 0 });
        },
        Some(code) if code >= FIRST_CODE => {
            log::error!("first code must be a literal, got {}",code);
            return Err(Error::BadCode { code, next: lzw.next_code() });
        },
        Some(code) => code
    };
    // first byte of the most recently written string
    let mut first_char = prev_code as u8;
    writer.write_all(&[first_char])?;
    let mut expanded_length: u64 = 1;
    let mut string: Vec<u8> = Vec::new();

    log::debug!("enter main LZW loop");
    loop {
        let code = match decoder.next()? {
            Some(code) => code,
            None => {
                log::error!("stream ended without stop code");
                return Err(Error::MissingSentinel);
            }
        };
        if code == stop_code {
            break;
        }
        let next_code = lzw.next_code();
        string.clear();
        if code == next_code {
            // The encoder used this code in the same step that created it, so it must be
            // the previous string plus its own first byte.
            string.push(first_char);
            lzw.expand(prev_code,&mut string)?;
        } else if code < next_code {
            lzw.expand(code,&mut string)?;
        } else {
            log::error!("Bad LZW code, expected at most {}, got {}",next_code,code);
            return Err(Error::BadCode { code, next: next_code });
        }
        string.reverse();
        first_char = string[0];
        writer.write_all(&string)?;
        expanded_length += string.len() as u64;
        log::trace!("  write {} as {:?}",code,string);
        if let Some(new_code) = lzw.learn(prev_code,first_char) {
            log::trace!("add {} linking to {}.{}",new_code,prev_code,first_char);
            if new_code == opt.max_code() {
                log::debug!("dictionary is full after {} bytes",expanded_length);
            }
        }
        prev_code = code;
    }
    let compressed_length = decoder.finish()?;
    log::debug!("end of data, closing stream");
    writer.flush()?;
    Ok(Sizes {
        compressed_size: compressed_length,
        decompressed_size: expanded_length
    })
}

/// Run a codec from one file to another.  The output is staged in a temporary file
/// in the destination directory, which only replaces `path_out` if the codec succeeds.
fn transform_file(path_in: &Path, path_out: &Path, opt: &Options,
    codec: fn(&mut File,&mut tempfile::NamedTempFile,&Options) -> Result<Sizes>) -> Result<Sizes> {
    let mut in_file = File::open(path_in)?;
    let dir = match path_out.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new(".")
    };
    let mut staged = tempfile::NamedTempFile::new_in(dir)?;
    let sizes = codec(&mut in_file,&mut staged,opt)?;
    staged.persist(path_out).map_err(|e| Error::Io(e.error))?;
    Ok(sizes)
}

/// Compress the file at `path_in` into `path_out`, replacing it if it exists.
/// On failure nothing is written at `path_out`.
pub fn compress_file<P,Q>(path_in: P, path_out: Q, opt: &Options) -> Result<Sizes>
where P: AsRef<Path>, Q: AsRef<Path> {
    transform_file(path_in.as_ref(),path_out.as_ref(),opt,compress)
}

/// Decompress the file at `path_in` into `path_out`, replacing it if it exists.
/// On failure, including a corrupt stream, nothing is written at `path_out`.
pub fn decompress_file<P,Q>(path_in: P, path_out: Q, opt: &Options) -> Result<Sizes>
where P: AsRef<Path>, Q: AsRef<Path> {
    transform_file(path_in.as_ref(),path_out.as_ref(),opt,decompress)
}

/// Convenience function, calls `compress` with a slice returning a Vec
pub fn compress_slice(slice: &[u8],opt: &Options) -> Result<Vec<u8>> {
    let mut src = Cursor::new(slice);
    let mut ans: Vec<u8> = Vec::new();
    compress(&mut src,&mut ans,opt)?;
    Ok(ans)
}

/// Convenience function, calls `decompress` with a slice returning a Vec
pub fn decompress_slice(slice: &[u8],opt: &Options) -> Result<Vec<u8>> {
    let mut src = Cursor::new(slice);
    let mut ans: Vec<u8> = Vec::new();
    decompress(&mut src,&mut ans,opt)?;
    Ok(ans)
}

// *************** TESTS *****************

#[cfg(test)]
fn pack(codes: &[usize],width: usize) -> Vec<u8> {
    let mut ans = Vec::new();
    let mut coder = BitWriter::new(&mut ans,width);
    for code in codes {
        coder.emit(*code).expect("emit failed");
    }
    coder.finish().expect("finish failed");
    ans
}

/// deterministic noise with values 0-15, enough variety to fill a 14 bit dictionary
#[cfg(test)]
fn nibbles(count: usize) -> Vec<u8> {
    let mut x: u32 = 12345;
    let mut ans = Vec::with_capacity(count);
    for _i in 0..count {
        x = x.wrapping_mul(1103515245).wrapping_add(12345) & 0x7fffffff;
        ans.push(((x >> 16) & 0x0f) as u8);
    }
    ans
}

#[test]
fn compression_works() {
    // Example adapted from wikipedia; in their example there are 26 symbols and # is a stop code.
    // Here # and newline are symbols, and the stop code is 0x3fff.
    let test_data = "TOBEORNOTTOBEORTOBEORNOT#\n".as_bytes();
    let lzw_str = "01 50 04 F0 10 80 45 01 3C 05 20 13 80 4F 01 50 10 00 40 81 04 04 24 10 30 41 41 07 00 8C 00 AF FF C0 00";
    let compressed = compress_slice(test_data,&STD_OPTIONS).expect("compression failed");
    assert_eq!(compressed,hex::decode(lzw_str.replace(" ","")).unwrap());
    let codes = [0x54,0x4f,0x42,0x45,0x4f,0x52,0x4e,0x4f,0x54,0x100,0x102,0x104,0x109,0x103,0x105,0x107,0x23,0x0a,0x3fff,0];
    assert_eq!(compressed,pack(&codes,14));
}

#[test]
fn self_referential_code() {
    // ABABABA makes the encoder use code 0x102 in the same step it is defined
    let test_data = "ABABABA".as_bytes();
    let compressed = compress_slice(test_data,&STD_OPTIONS).expect("compression failed");
    assert_eq!(compressed,pack(&[0x41,0x42,0x100,0x102,0x3fff,0],14));
    assert_eq!(compressed,hex::decode("01040420400102FFFC00").unwrap());
    let expanded = decompress_slice(&compressed,&STD_OPTIONS).expect("expansion failed");
    assert_eq!(test_data.to_vec(),expanded);
}

#[test]
fn single_byte() {
    let compressed = compress_slice(&[0x41],&STD_OPTIONS).expect("compression failed");
    assert_eq!(compressed,hex::decode("0107FFF000").unwrap());
    let expanded = decompress_slice(&compressed,&STD_OPTIONS).expect("expansion failed");
    assert_eq!(expanded,vec![0x41]);
}

#[test]
fn empty_input() {
    let compressed = compress_slice(&[],&STD_OPTIONS).expect("compression failed");
    assert!(compressed.is_empty());
    let expanded = decompress_slice(&compressed,&STD_OPTIONS).expect("expansion failed");
    assert!(expanded.is_empty());
    // a stream with only the stop and flush codes is also empty
    let stop_only = pack(&[0x3fff,0],14);
    assert_eq!(stop_only,vec![0xff,0xfc,0x00]);
    let expanded = decompress_slice(&stop_only,&STD_OPTIONS).expect("expansion failed");
    assert!(expanded.is_empty());
}

#[test]
fn invertibility() {
    let test_data = "I am Sam. Sam I am. I do not like this Sam I am.\n".as_bytes();
    let compressed = compress_slice(test_data,&STD_OPTIONS).expect("compression failed");
    let expanded = decompress_slice(&compressed,&STD_OPTIONS).expect("expansion failed");
    assert_eq!(test_data.to_vec(),expanded);
}

#[test]
fn invertibility_all_widths() {
    let mut test_data = "I am Sam. Sam I am. I do not like this Sam I am.\n".repeat(40).into_bytes();
    test_data.extend(nibbles(5000));
    test_data.extend((0..=255).collect::<Vec<u8>>());
    for width in 9..=16 {
        let opt = Options::with_code_width(width).expect("width rejected");
        let compressed = compress_slice(&test_data,&opt).expect("compression failed");
        let expanded = decompress_slice(&compressed,&opt).expect("expansion failed");
        assert_eq!(test_data,expanded,"width {}",width);
    }
}

#[test]
fn saturated_dictionary() {
    // 200000 random nibbles use up every one of the 16127 entries
    let test_data = nibbles(200000);
    let compressed = compress_slice(&test_data,&STD_OPTIONS).expect("compression failed");
    assert_eq!(compressed.len(),114651);
    let expanded = decompress_slice(&compressed,&STD_OPTIONS).expect("expansion failed");
    assert_eq!(test_data,expanded);
}

#[test]
fn saturated_dictionary_repetitive() {
    let opt = Options::with_code_width(9).expect("width rejected");
    let test_data = "abcabcabcabc".repeat(1000).into_bytes();
    let compressed = compress_slice(&test_data,&opt).expect("compression failed");
    assert_eq!(compressed.len(),303);
    let expanded = decompress_slice(&compressed,&opt).expect("expansion failed");
    assert_eq!(test_data,expanded);
}

#[test]
fn truncation_is_detected() {
    let test_data = "TOBEORNOTTOBEORTOBEORNOT#\n".as_bytes();
    let compressed = compress_slice(test_data,&STD_OPTIONS).expect("compression failed");
    match decompress_slice(&compressed[0..compressed.len()-1],&STD_OPTIONS) {
        Err(Error::TrailerMismatch { found: 34, expected: 35 }) => {},
        other => panic!("unexpected result {:?}",other)
    }
    for cut in 1..compressed.len() {
        let err = decompress_slice(&compressed[0..cut],&STD_OPTIONS).expect_err("truncation not detected");
        assert!(err.is_malformed(),"cut at {}: {}",cut,err);
    }
}

#[test]
fn trailing_garbage_is_detected() {
    let mut compressed = compress_slice("ABABABA".as_bytes(),&STD_OPTIONS).expect("compression failed");
    compressed.extend_from_slice(&[0x55;100]);
    let err = decompress_slice(&compressed,&STD_OPTIONS).expect_err("garbage not detected");
    assert!(matches!(err,Error::TrailerMismatch { expected: 10, .. }));
}

#[test]
fn bad_codes_are_detected() {
    let first_not_literal = pack(&[0x100,0x3fff,0],14);
    assert!(matches!(decompress_slice(&first_not_literal,&STD_OPTIONS),Err(Error::BadCode { code: 0x100, next: 0x100 })));
    let undefined = pack(&[0x41,0x105,0x3fff,0],14);
    assert!(matches!(decompress_slice(&undefined,&STD_OPTIONS),Err(Error::BadCode { code: 0x105, next: 0x100 })));
    // 4 codes end exactly on a byte boundary
    let no_stop = pack(&[0x41,0x42,0x43,0x44],14);
    assert!(matches!(decompress_slice(&no_stop,&STD_OPTIONS),Err(Error::MissingSentinel)));
}

#[test]
fn width_is_validated() {
    assert!(matches!(Options::with_code_width(8),Err(Error::UnsupportedWidth(8))));
    assert!(matches!(Options::with_code_width(17),Err(Error::UnsupportedWidth(17))));
    let opt = Options { code_width: 20 };
    assert!(matches!(compress_slice(b"abc",&opt),Err(Error::UnsupportedWidth(20))));
    assert_eq!(STD_OPTIONS.max_value(),16383);
    assert_eq!(STD_OPTIONS.max_code(),16382);
    assert_eq!(STD_OPTIONS.table_size().unwrap(),18041);
}

#[test]
fn sizes_match_streams() {
    let test_data = "I am Sam. Sam I am. I do not like this Sam I am.\n".repeat(10).into_bytes();
    let mut compressed = Vec::new();
    let sizes = compress(&mut test_data.as_slice(),&mut compressed,&STD_OPTIONS).expect("compression failed");
    assert_eq!(sizes.decompressed_size,test_data.len() as u64);
    assert_eq!(sizes.compressed_size,compressed.len() as u64);
    let mut expanded = Vec::new();
    let sizes2 = decompress(&mut compressed.as_slice(),&mut expanded,&STD_OPTIONS).expect("expansion failed");
    assert_eq!(sizes,sizes2);
    assert!(sizes.ratio() < 100.0);
    assert_eq!(Sizes::default().ratio(),0.0);
}

#[test]
fn file_round_trip() {
    let dir = tempfile::tempdir().expect("no temp dir");
    let orig = dir.path().join("sam.txt");
    let cmp = dir.path().join("sam_compressed.txt");
    let exp = dir.path().join("sam_decompressed.txt");
    let test_data = "I am Sam. Sam I am. I do not like this Sam I am.\n".repeat(50).into_bytes();
    std::fs::write(&orig,&test_data).expect("write failed");
    let sizes = compress_file(&orig,&cmp,&STD_OPTIONS).expect("compression failed");
    assert_eq!(sizes.decompressed_size,std::fs::metadata(&orig).unwrap().len());
    assert_eq!(sizes.compressed_size,std::fs::metadata(&cmp).unwrap().len());
    let sizes2 = decompress_file(&cmp,&exp,&STD_OPTIONS).expect("expansion failed");
    assert_eq!(sizes,sizes2);
    assert_eq!(std::fs::read(&exp).unwrap(),test_data);
}

#[test]
fn failed_file_leaves_nothing() {
    let dir = tempfile::tempdir().expect("no temp dir");
    let bad = dir.path().join("bad.lzw");
    let out = dir.path().join("bad.txt");
    let compressed = compress_slice("ABABABA".as_bytes(),&STD_OPTIONS).expect("compression failed");
    std::fs::write(&bad,&compressed[0..compressed.len()-1]).expect("write failed");
    let err = decompress_file(&bad,&out,&STD_OPTIONS).expect_err("truncation not detected");
    assert!(err.is_malformed());
    assert!(!out.exists());
    // only the input remains, the staging file was removed
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(),1);
    // missing input is an i/o error
    let err = compress_file(dir.path().join("missing"),&out,&STD_OPTIONS).expect_err("missing file accepted");
    assert!(matches!(err,Error::Io(_)));
    assert!(!out.exists());
}
