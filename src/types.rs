//! Class codes and their names
//!
//! Codes 0..=58 are built in. A class file may add names after them; each
//! new name takes the lowest unused code from 59 upward.

use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use tracing::{debug, warn};

use crate::error::{ClassifierError, Result};

pub const UNCLASSIFIED: i32 = 0;
pub const RANDOM: i32 = 54;
/// Unigram constant value: one byte dominates
pub const UCV_CONST: i32 = 100;
/// Bigram constant value: one byte pair dominates
pub const BCV_CONST: i32 = 101;
/// Trigram constant value; reserved
pub const TCV_CONST: i32 = 102;

const BUILTIN_NAMES: [&str; 59] = [
    "UNCLASSIFIED",
    "TEXT",
    "CSV",
    "LOG",
    "HTML",
    "XML",
    "ASPX",
    "JSON",
    "JS",
    "JAVA",
    "CSS",
    "B64",
    "B85",
    "B16",
    "URL",
    "PS",
    "RTF",
    "TBIRD",
    "PST",
    "PNG",
    "GIF",
    "TIF",
    "JB2",
    "GZ",
    "ZIP",
    "JAR",
    "RPM",
    "BZ2",
    "PDF",
    "DOCX",
    "XLSX",
    "PPTX",
    "JPG",
    "MP3",
    "M4A",
    "MP4",
    "AVI",
    "WMV",
    "FLV",
    "SWF",
    "WAV",
    "WMA",
    "MOV",
    "DOC",
    "XLS",
    "PPT",
    "FS-FAT",
    "FS-NTFS",
    "FS-EXT",
    "EXE",
    "DLL",
    "ELF",
    "BMP",
    "AES",
    "RAND",
    "PPS",
    "RAR",
    "3GP",
    "7Z",
];

const OVERRIDE_NAMES: [(i32, &str); 3] = [
    (UCV_CONST, "UCV_CONST"),
    (BCV_CONST, "BCV_CONST"),
    (TCV_CONST, "TCV_CONST"),
];

/// Bidirectional map between class codes and names
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeNameTable {
    by_code: BTreeMap<i32, String>,
    by_name: HashMap<String, i32>,
}

impl TypeNameTable {
    /// Table holding only the built-in codes
    pub fn builtin() -> Self {
        let mut table = Self {
            by_code: BTreeMap::new(),
            by_name: HashMap::new(),
        };
        for (code, name) in BUILTIN_NAMES.iter().enumerate() {
            table.insert_at(code as i32, name);
        }
        for (code, name) in OVERRIDE_NAMES {
            table.insert_at(code, name);
        }
        table
    }

    /// Built-in codes plus the names listed in a class file
    ///
    /// A class file that cannot be opened leaves only the built-in codes.
    pub fn with_class_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut table = Self::builtin();
        let file = match File::open(path) {
            Ok(file) => file,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "cannot open class file, using built-in types");
                return Ok(table);
            }
        };
        let added = table.extend_from_reader(BufReader::new(file))?;
        debug!(path = %path.display(), added, "loaded class file");
        Ok(table)
    }

    /// Add one name per line; returns how many names were new
    pub fn extend_from_reader<R: BufRead>(&mut self, reader: R) -> Result<usize> {
        let mut added = 0;
        for line in reader.lines() {
            let line = line?;
            let name = line.trim_end();
            if name.is_empty() || self.by_name.contains_key(name) {
                continue;
            }
            self.insert(name);
            added += 1;
        }
        Ok(added)
    }

    /// Code for `name`, assigning the next unused one if it is new
    pub fn insert(&mut self, name: &str) -> i32 {
        if let Some(code) = self.by_name.get(name) {
            return *code;
        }
        let mut code = BUILTIN_NAMES.len() as i32;
        while self.by_code.contains_key(&code) {
            code += 1;
        }
        self.insert_at(code, name);
        code
    }

    fn insert_at(&mut self, code: i32, name: &str) {
        self.by_code.insert(code, name.to_string());
        self.by_name.insert(name.to_string(), code);
    }

    pub fn name_for_type(&self, code: i32) -> Option<&str> {
        self.by_code.get(&code).map(String::as_str)
    }

    /// Code for a name; an all-digit string is taken as the code itself
    pub fn type_for_name(&self, name: &str) -> Result<i32> {
        if let Some(code) = self.by_name.get(name) {
            return Ok(*code);
        }
        if !name.is_empty() && name.bytes().all(|b| b.is_ascii_digit()) {
            return name
                .parse()
                .map_err(|_| ClassifierError::UnknownType(name.to_string()));
        }
        Err(ClassifierError::UnknownType(name.to_string()))
    }

    /// Display name for a code, falling back to the number
    pub fn display_name(&self, code: i32) -> String {
        self.name_for_type(code)
            .map(str::to_string)
            .unwrap_or_else(|| code.to_string())
    }

    pub fn len(&self) -> usize {
        self.by_code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_code.is_empty()
    }

    /// Entries in ascending code order
    pub fn iter(&self) -> impl Iterator<Item = (i32, &str)> {
        self.by_code.iter().map(|(code, name)| (*code, name.as_str()))
    }
}

impl Default for TypeNameTable {
    fn default() -> Self {
        Self::builtin()
    }
}
