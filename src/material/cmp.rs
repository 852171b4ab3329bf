//! CMP color map: the 256-entry palette used to resolve 8-bit MAT textures.
//!
//! Layout (little endian): `"CMP "` magic, i32 version, i32 alpha-table flag,
//! 52 reserved bytes, then 256 RGB triplets. Light and transparency tables
//! that follow the palette are not read.

use std::fs::File;
use std::io::{BufReader, BufWriter, Cursor, Read, Seek, Write};
use std::path::Path;

use binrw::{binrw, BinRead, BinWrite};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SithError};

pub const CMP_MAGIC: &[u8; 4] = b"CMP ";
pub const PALETTE_SIZE: usize = 256;

/// Grim Fandango.
pub const CMP_VERSION_GRIM: i32 = 0x14;
/// Jedi Knight, Mysteries of the Sith, DroidWorks.
pub const CMP_VERSION_JK: i32 = 0x1E;

#[binrw]
#[brw(little)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CmpPaletteRgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl CmpPaletteRgb {
    pub fn to_linear(&self, alpha: f32) -> [f32; 4] {
        [
            self.r as f32 / 255.0,
            self.g as f32 / 255.0,
            self.b as f32 / 255.0,
            alpha,
        ]
    }
}

#[binrw]
#[brw(little)]
#[derive(Debug, Clone)]
struct CmpHeader {
    magic: [u8; 4],
    version: i32,
    has_alpha_table: i32,
    reserved: [u8; 52],
}

#[binrw]
#[brw(little)]
#[derive(Debug, Clone)]
struct CmpPalette {
    #[br(count = PALETTE_SIZE)]
    entries: Vec<CmpPaletteRgb>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorMap {
    pub version: i32,
    pub has_alpha_table: bool,
    #[serde(skip)]
    pub reserved: Vec<u8>,
    pub palette: Vec<CmpPaletteRgb>,
}

impl ColorMap {
    /// A black palette of the given version.
    pub fn new(version: i32) -> Self {
        Self {
            version,
            has_alpha_table: false,
            reserved: vec![0; 52],
            palette: vec![CmpPaletteRgb::default(); PALETTE_SIZE],
        }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        let mut reader = BufReader::new(file);
        Self::read(&mut reader)
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        Self::read(&mut Cursor::new(data))
    }

    pub fn read<R: Read + Seek>(reader: &mut R) -> Result<Self> {
        let header = CmpHeader::read(reader)?;
        if &header.magic != CMP_MAGIC {
            return Err(SithError::InvalidMagic {
                format: "CMP",
                expected: String::from_utf8_lossy(CMP_MAGIC).into_owned(),
                found: String::from_utf8_lossy(&header.magic).into_owned(),
            });
        }
        if header.version != CMP_VERSION_GRIM && header.version != CMP_VERSION_JK {
            return Err(SithError::UnsupportedVersion {
                format: "CMP",
                version: format!("0x{:02x}", header.version),
            });
        }

        let palette = CmpPalette::read(reader)?;
        Ok(Self {
            version: header.version,
            has_alpha_table: header.has_alpha_table != 0,
            reserved: header.reserved.to_vec(),
            palette: palette.entries,
        })
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = File::create(path.as_ref())?;
        let mut w = BufWriter::new(file);
        self.write(&mut w)?;
        w.flush()?;
        Ok(())
    }

    pub fn write<W: Write + Seek>(&self, writer: &mut W) -> Result<()> {
        if self.palette.len() != PALETTE_SIZE {
            return Err(SithError::invalid_format(
                "CMP",
                format!("palette has {} entries, expected {}", self.palette.len(), PALETTE_SIZE),
            ));
        }

        let mut reserved = [0u8; 52];
        let n = self.reserved.len().min(reserved.len());
        reserved[..n].copy_from_slice(&self.reserved[..n]);

        let header = CmpHeader {
            magic: *CMP_MAGIC,
            version: self.version,
            has_alpha_table: self.has_alpha_table as i32,
            reserved,
        };
        header.write(writer)?;
        CmpPalette { entries: self.palette.clone() }.write(writer)?;
        Ok(())
    }

    pub fn color(&self, index: u8) -> Option<CmpPaletteRgb> {
        self.palette.get(index as usize).copied()
    }
}
