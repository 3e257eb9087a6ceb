//! LZW dictionaries.
//!
//! Encoding has to find the code for a (prefix,symbol) pair.  This is done with an
//! open addressing hash table whose capacity is a prime somewhat larger than the code space,
//! so that the probe sequence visits every slot and there is always an empty one.
//! Decoding always knows the code it wants, so its table is indexed by code directly.
//!
//! Codes 0-255 are the literal bytes and never appear in either table.

use crate::{Error,Result};

/// First code available for dictionary entries, codes below this are literals
pub const FIRST_CODE: usize = 256;

/// prime table size for each supported code width
const TABLE_SIZES: [(usize,usize);8] = [
    (9,1021),
    (10,2053),
    (11,4099),
    (12,5021),
    (13,9029),
    (14,18041),
    (15,35023),
    (16,69001)
];

/// Size of the hash table for a given code width, or None if the width is not supported
pub fn table_size(code_width: usize) -> Option<usize> {
    TABLE_SIZES.iter().find(|(w,_)| *w==code_width).map(|(_,sz)| *sz)
}

/// Result of probing the encoding table
#[derive(Debug,PartialEq)]
pub enum Probe {
    /// the pair is in the table with this code
    Found(usize),
    /// the pair is absent, this is the slot where it belongs
    Vacant(usize)
}

/// Hash table mapping (prefix,symbol) to code, used during compression.
/// Three parallel arrays are indexed by slot, the slot is found by probing.
pub struct EncodeTable {
    /// code stored in each slot, None if the slot is empty
    codes: Vec<Option<usize>>,
    prefixes: Vec<usize>,
    syms: Vec<u8>,
    shift: usize,
    max_code: usize,
    next_code: usize
}

impl EncodeTable {
    /// Create an empty table, `table_size` should be a prime greater than `2^code_width`
    pub fn create(code_width: usize,table_size: usize) -> Self {
        Self {
            codes: vec![None;table_size],
            prefixes: vec![0;table_size],
            syms: vec![0;table_size],
            shift: code_width - 8,
            max_code: (1 << code_width) - 2,
            next_code: FIRST_CODE
        }
    }
    /// the code that will be assigned by the next insertion
    pub fn next_code(&self) -> usize {
        self.next_code
    }
    pub fn is_full(&self) -> bool {
        self.next_code > self.max_code
    }
    /// Look for `(prefix,sym)`.  If it is not there, the slot where it should be inserted is
    /// returned, so the caller can insert without hashing again.
    pub fn lookup(&self,prefix: usize,sym: u8) -> Probe {
        let size = self.codes.len();
        let mut index = ((sym as usize) << self.shift) ^ prefix;
        let step = match index {
            0 => 1,
            i => size - i
        };
        loop {
            match self.codes[index] {
                None => return Probe::Vacant(index),
                Some(code) if self.prefixes[index]==prefix && self.syms[index]==sym => return Probe::Found(code),
                Some(_) => {}
            }
            if index < step {
                index += size;
            }
            index -= step;
        }
    }
    /// Store `(prefix,sym)` in `slot`, which must have come from `lookup`.
    /// Returns the new code, or None if the code space is used up, in which case nothing is stored.
    pub fn insert(&mut self,slot: usize,prefix: usize,sym: u8) -> Option<usize> {
        if self.is_full() {
            return None;
        }
        let code = self.next_code;
        self.codes[slot] = Some(code);
        self.prefixes[slot] = prefix;
        self.syms[slot] = sym;
        self.next_code += 1;
        Some(code)
    }
}

/// Code indexed table mapping code to (prefix,symbol), used during expansion.
pub struct DecodeTable {
    prefixes: Vec<usize>,
    syms: Vec<u8>,
    max_code: usize,
    next_code: usize
}

impl DecodeTable {
    pub fn create(code_width: usize) -> Self {
        let code_space = 1 << code_width;
        Self {
            prefixes: vec![0;code_space],
            syms: vec![0;code_space],
            max_code: code_space - 2,
            next_code: FIRST_CODE
        }
    }
    /// the code that will be assigned by the next call to `learn`
    pub fn next_code(&self) -> usize {
        self.next_code
    }
    /// Define the next code as `prefix` followed by `sym`.
    /// Returns the new code, or None if the code space is used up.
    pub fn learn(&mut self,prefix: usize,sym: u8) -> Option<usize> {
        if self.next_code > self.max_code {
            return None;
        }
        let code = self.next_code;
        self.prefixes[code] = prefix;
        self.syms[code] = sym;
        self.next_code += 1;
        Some(code)
    }
    /// Walk back through the chain of prefixes, appending the string for `code` to `rev`
    /// in *reverse* order.  The literal that ends the chain is the last byte appended.
    pub fn expand(&self,mut code: usize,rev: &mut Vec<u8>) -> Result<()> {
        let mut links = 0;
        while code >= FIRST_CODE {
            if code >= self.next_code {
                return Err(Error::BadCode { code, next: self.next_code });
            }
            rev.push(self.syms[code]);
            code = self.prefixes[code];
            links += 1;
            if links > self.max_code {
                return Err(Error::ChainTooLong);
            }
        }
        rev.push(code as u8);
        Ok(())
    }
}

// *************** TESTS *****************

#[test]
fn empty_slot_is_the_hash() {
    let table = EncodeTable::create(14,18041);
    // ('A' << 6) ^ 'A'
    assert_eq!(table.lookup(0x41,0x41),Probe::Vacant(0x1001));
    assert_eq!(table.lookup(0,0),Probe::Vacant(0));
}

#[test]
fn insert_then_find() {
    let mut table = EncodeTable::create(14,18041);
    let slot = match table.lookup(0x41,0x42) {
        Probe::Vacant(slot) => slot,
        Probe::Found(_) => panic!("empty table had a match")
    };
    assert_eq!(table.insert(slot,0x41,0x42),Some(256));
    assert_eq!(table.lookup(0x41,0x42),Probe::Found(256));
    assert_eq!(table.next_code(),257);
}

#[test]
fn collisions_are_probed() {
    // (1 << 6) ^ 0 and (0 << 6) ^ 64 land on the same slot
    let mut table = EncodeTable::create(14,18041);
    let first = match table.lookup(0,1) {
        Probe::Vacant(slot) => slot,
        Probe::Found(_) => panic!("unexpected match")
    };
    assert_eq!(first,64);
    table.insert(first,0,1);
    let second = match table.lookup(64,0) {
        Probe::Vacant(slot) => slot,
        Probe::Found(_) => panic!("collision reported as match")
    };
    assert_ne!(second,first);
    // step is 18041-64, so the next probe wraps around
    assert_eq!(second,128);
    table.insert(second,64,0);
    assert_eq!(table.lookup(0,1),Probe::Found(256));
    assert_eq!(table.lookup(64,0),Probe::Found(257));
}

#[test]
fn codes_increase_until_full() {
    // 9 bit codes: 256..=510 can be assigned, 511 is reserved
    let mut table = EncodeTable::create(9,1021);
    let mut assigned = Vec::new();
    for prefix in 0..400 {
        match table.lookup(prefix,b'x') {
            Probe::Vacant(slot) => {
                if let Some(code) = table.insert(slot,prefix,b'x') {
                    assigned.push(code);
                }
            },
            Probe::Found(_) => panic!("pair was never inserted")
        }
    }
    assert!(table.is_full());
    assert_eq!(assigned,(256..=510).collect::<Vec<usize>>());
    // lookups still work for everything learned
    assert_eq!(table.lookup(254,b'x'),Probe::Found(510));
    assert!(matches!(table.lookup(255,b'x'),Probe::Vacant(_)));
}

#[test]
fn decode_table_expands_chains() {
    let mut table = DecodeTable::create(14);
    assert_eq!(table.learn(b'A' as usize,b'B'),Some(256));
    assert_eq!(table.learn(256,b'A'),Some(257));
    let mut rev = Vec::new();
    table.expand(257,&mut rev).expect("expand failed");
    assert_eq!(rev,b"ABA".iter().rev().copied().collect::<Vec<u8>>());
    rev.clear();
    table.expand(b'Z' as usize,&mut rev).expect("expand failed");
    assert_eq!(rev,b"Z".to_vec());
}

#[test]
fn decode_table_rejects_bad_chains() {
    let mut table = DecodeTable::create(9);
    let mut rev = Vec::new();
    assert!(matches!(table.expand(300,&mut rev),Err(Error::BadCode { code: 300, next: 256 })));
    // an entry that refers to itself can never reach a literal
    table.learn(256,b'a');
    rev.clear();
    assert!(matches!(table.expand(256,&mut rev),Err(Error::ChainTooLong)));
}

#[test]
fn decode_table_fills_up() {
    let mut table = DecodeTable::create(9);
    for i in 256..=510 {
        assert_eq!(table.learn(b'a' as usize,b'b'),Some(i));
    }
    assert_eq!(table.learn(b'a' as usize,b'b'),None);
    assert_eq!(table.next_code(),511);
}
