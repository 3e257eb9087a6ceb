//! Fixed width code packing.
//!
//! Codes are packed MSB first into a 32 bit accumulator, whole bytes are moved out
//! (or in) as soon as they are available.  The writer never outputs a partial final byte,
//! the encoder is expected to follow the last meaningful code with a flush code.

use std::io::{Read,Write,ErrorKind};
use crate::{Error,Result};

/// Packs codes of a fixed width into a byte stream
pub struct BitWriter<W: Write> {
    writer: W,
    width: u32,
    acc: u32,
    pending: u32,
    count: u64
}

impl <W: Write> BitWriter<W> {
    pub fn new(writer: W,width: usize) -> Self {
        Self {
            writer,
            width: width as u32,
            acc: 0,
            pending: 0,
            count: 0
        }
    }
    /// Append `code` to the stream, writing any bytes that are complete.
    pub fn emit(&mut self,code: usize) -> Result<()> {
        debug_assert!(code < 1 << self.width);
        self.acc |= (code as u32) << (32 - self.width - self.pending);
        self.pending += self.width;
        while self.pending >= 8 {
            self.writer.write_all(&[(self.acc >> 24) as u8])?;
            self.acc <<= 8;
            self.pending -= 8;
            self.count += 1;
        }
        Ok(())
    }
    /// Flush the underlying writer and return the number of bytes written.
    /// Bits that do not fill a byte are discarded.
    pub fn finish(mut self) -> Result<u64> {
        self.writer.flush()?;
        Ok(self.count)
    }
}

/// Unpacks codes of a fixed width from a byte stream
pub struct BitReader<R: Read> {
    reader: R,
    width: u32,
    acc: u32,
    pending: u32,
    exhausted: bool,
    /// bytes consumed so far
    count: u64,
    /// codes returned so far
    codes: u64
}

impl <R: Read> BitReader<R> {
    pub fn new(reader: R,width: usize) -> Self {
        Self {
            reader,
            width: width as u32,
            acc: 0,
            pending: 0,
            exhausted: false,
            count: 0,
            codes: 0
        }
    }
    /// keep at least 25 bits in the accumulator, unless the input runs out
    fn fill(&mut self) -> Result<()> {
        let mut by: [u8;1] = [0];
        while self.pending <= 24 && !self.exhausted {
            match self.reader.read_exact(&mut by) {
                Ok(()) => {
                    self.acc |= (by[0] as u32) << (24 - self.pending);
                    self.pending += 8;
                    self.count += 1;
                },
                Err(e) if e.kind()==ErrorKind::UnexpectedEof => {
                    self.exhausted = true;
                },
                Err(e) => return Err(Error::Io(e))
            }
        }
        Ok(())
    }
    /// Get the next code.  Returns None if the input ended cleanly on a code boundary,
    /// or `TruncatedStream` if it ended partway through a code.
    pub fn next(&mut self) -> Result<Option<usize>> {
        self.fill()?;
        if self.pending == 0 {
            return Ok(None);
        }
        if self.pending < self.width {
            return Err(Error::TruncatedStream);
        }
        let code = self.acc >> (32 - self.width);
        self.acc <<= self.width;
        self.pending -= self.width;
        self.codes += 1;
        Ok(Some(code as usize))
    }
    /// Call after the end-of-stream code has been read.
    /// The stream is expected to end with the bytes completed by one more code, and all of
    /// those bits must be zero.  Returns the total number of bytes consumed.
    pub fn finish(mut self) -> Result<u64> {
        let width = self.width as u64;
        let expected = (self.codes * width + width) / 8;
        self.fill()?;
        let mut rest = Vec::new();
        if !self.exhausted {
            // bounded, so a long run of trailing garbage is not read in its entirety
            let limit = expected.saturating_sub(self.count) + 1;
            self.reader.by_ref().take(limit).read_to_end(&mut rest)?;
        }
        let found = self.count + rest.len() as u64;
        if found != expected || self.acc != 0 || rest.iter().any(|b| *b != 0) {
            log::error!("bad trailer: {} bytes, expected {}",found,expected);
            return Err(Error::TrailerMismatch { found, expected });
        }
        Ok(found)
    }
}

// *************** TESTS *****************

#[cfg(test)]
fn pack(codes: &[usize],width: usize) -> Vec<u8> {
    let mut ans = Vec::new();
    let mut writer = BitWriter::new(&mut ans,width);
    for code in codes {
        writer.emit(*code).expect("emit failed");
    }
    writer.finish().expect("finish failed");
    ans
}

#[test]
fn codes_are_msb_first() {
    use bit_vec::BitVec;
    let codes = [0x41,0x42,0x100,0x102,0x3fff,0];
    let packed = pack(&codes,14);
    assert_eq!(packed,hex::decode("01040420400102fffc00").unwrap());
    // read the bits back one at a time and reassemble
    let bits = BitVec::from_bytes(&packed);
    let mut unpacked = Vec::new();
    for i in 0..bits.len()/14 {
        let mut code = 0;
        for b in 0..14 {
            code = (code << 1) | bits.get(i*14 + b).unwrap() as usize;
        }
        unpacked.push(code);
    }
    // last code is only partly present, but it was all zeros
    assert_eq!(unpacked,codes[0..5].to_vec());
    assert!(bits.iter().skip(5*14).all(|b| !b));
}

#[test]
fn bytes_are_counted() {
    let mut ans = Vec::new();
    let mut writer = BitWriter::new(&mut ans,9);
    writer.emit(0x1ff).expect("emit failed");
    writer.emit(0x1ff).expect("emit failed");
    // 18 bits, 2 whole bytes
    assert_eq!(writer.finish().expect("finish failed"),2);
    assert_eq!(ans,vec![0xff,0xff]);
}

#[test]
fn reader_inverts_writer() {
    let codes = [0x41,0x42,0x100,0x102,0x3fff,0];
    let packed = pack(&codes,14);
    let mut reader = BitReader::new(packed.as_slice(),14);
    for code in &codes[0..5] {
        assert_eq!(reader.next().expect("read failed"),Some(*code));
    }
    assert_eq!(reader.finish().expect("bad trailer"),10);
}

#[test]
fn reader_end_of_input() {
    // 4 codes of 14 bits is exactly 7 bytes
    let packed = pack(&[1,2,3,4],14);
    assert_eq!(packed.len(),7);
    let mut reader = BitReader::new(packed.as_slice(),14);
    for code in 1..=4 {
        assert_eq!(reader.next().expect("read failed"),Some(code));
    }
    assert_eq!(reader.next().expect("read failed"),None);
    // drop a byte and the last code is cut off
    let mut reader = BitReader::new(&packed[0..6],14);
    for code in 1..=3 {
        assert_eq!(reader.next().expect("read failed"),Some(code));
    }
    assert!(matches!(reader.next(),Err(Error::TruncatedStream)));
}

#[test]
fn trailer_is_checked() {
    let packed = pack(&[0x41,0x3fff,0],14);
    assert_eq!(packed.len(),5);
    let read_two = |data: &[u8]| -> Result<u64> {
        let mut reader = BitReader::new(data,14);
        reader.next()?;
        reader.next()?;
        reader.finish()
    };
    assert_eq!(read_two(&packed).expect("bad trailer"),5);
    assert!(matches!(read_two(&packed[0..4]),Err(Error::TrailerMismatch { found: 4, expected: 5 })));
    let mut extra = packed.clone();
    extra.push(0);
    assert!(matches!(read_two(&extra),Err(Error::TrailerMismatch { found: 6, expected: 5 })));
    let mut dirty = packed.clone();
    dirty[4] = 1;
    assert!(matches!(read_two(&dirty),Err(Error::TrailerMismatch { found: 5, expected: 5 })));
}
