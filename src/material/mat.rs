//! MAT material files: solid palette colors or mipmapped texture cels.
//!
//! Reading keeps the raw level bytes of every texture so a file can be
//! written back unchanged. Decoding to RGBA is a separate step because
//! 8-bit textures need a [`ColorMap`].

use std::fs::File;
use std::io::{BufReader, BufWriter, Cursor, Read, Seek, Write};
use std::path::Path;

use binrw::{binrw, BinRead, BinWrite};
use image::RgbaImage;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SithError};
use crate::validation::limits::MAX_TEXTURE_SLOTS;

use super::cmp::ColorMap;

pub const MAT_MAGIC: &[u8; 4] = b"MAT ";
pub const MAT_VERSION: i32 = 0x32;
/// Side length of the swatch generated for color materials.
pub const COLOR_SWATCH_SIZE: u32 = 64;
pub const DEFAULT_MAX_CELS: usize = MAX_TEXTURE_SLOTS;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatType {
    Color = 0,
    Texture = 2,
}

impl MatType {
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            0 => Some(Self::Color),
            2 => Some(Self::Texture),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColorMode {
    Indexed = 0,
    Rgb = 1,
    Rgba = 2,
}

impl ColorMode {
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            0 => Some(Self::Indexed),
            1 => Some(Self::Rgb),
            2 => Some(Self::Rgba),
            _ => None,
        }
    }
}

#[binrw]
#[brw(little)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ColorFormat {
    pub color_mode: u32,
    pub bpp: u32,
    pub red_bpp: u32,
    pub green_bpp: u32,
    pub blue_bpp: u32,
    pub red_shl: u32,
    pub green_shl: u32,
    pub blue_shl: u32,
    pub red_shr: u32,
    pub green_shr: u32,
    pub blue_shr: u32,
    pub alpha_bpp: u32,
    pub alpha_shl: u32,
    pub alpha_shr: u32,
}

impl ColorFormat {
    pub fn indexed() -> Self {
        Self {
            color_mode: ColorMode::Indexed as u32,
            bpp: 8,
            ..Self::default()
        }
    }

    /// Pixels are palette indices.
    pub fn is_indexed(&self) -> bool {
        self.color_mode == ColorMode::Indexed as u32 || self.bpp == 8
    }

    pub fn bytes_per_pixel(&self) -> usize {
        (self.bpp / 8) as usize
    }

    pub fn has_alpha(&self) -> bool {
        self.alpha_bpp > 0
    }
}

#[binrw]
#[brw(little)]
#[derive(Debug, Clone)]
struct RawMatHeader {
    magic: [u8; 4],
    version: i32,
    mat_type: u32,
    record_count: i32,
    texture_count: i32,
    color_format: ColorFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatHeader {
    pub version: i32,
    pub mat_type: MatType,
    pub record_count: i32,
    pub texture_count: i32,
    pub color_format: ColorFormat,
}

#[binrw]
#[brw(little)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MatColorRecord {
    pub record_type: i32,
    /// Palette index of the color.
    pub color_index: i32,
    pub unknown: [i32; 4],
}

#[binrw]
#[brw(little)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MatTextureRecord {
    pub record_type: i32,
    pub transparent_color: i32,
    pub unknown: [i32; 7],
    pub cel_idx: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatRecord {
    Color(MatColorRecord),
    Texture(MatTextureRecord),
}

#[binrw]
#[brw(little)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MipmapHeader {
    pub width: i32,
    pub height: i32,
    pub transparent: i32,
    pub transparent_color: i32,
    pub unknown: i32,
    pub levels: i32,
}

impl MipmapHeader {
    pub fn level_size(&self, level: u32) -> (u32, u32) {
        let w = (self.width.max(0) as u32).checked_shr(level).unwrap_or(0);
        let h = (self.height.max(0) as u32).checked_shr(level).unwrap_or(0);
        (w, h)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatTexture {
    pub header: MipmapHeader,
    /// Raw pixel bytes per mipmap level, largest first, top row first.
    #[serde(skip)]
    pub levels: Vec<Vec<u8>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mat {
    pub name: String,
    pub header: MatHeader,
    pub records: Vec<MatRecord>,
    pub textures: Vec<MatTexture>,
}

/// One decoded image as a flat RGBA float array, four channels per pixel
/// in `0.0..=1.0`.
///
/// `pixels` holds the source rows in reverse order, so the last row stored in
/// the file comes first. [`DecodedLevel::to_rgba_image`] restores file order
/// for PNG export. `pixels` is `None` when an indexed image was decoded
/// without a color map.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedLevel {
    pub width: u32,
    pub height: u32,
    pub pixels: Option<Vec<f32>>,
}

impl DecodedLevel {
    /// RGBA value of the pixel at `(x, y)` in decoded row order.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[f32; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let start = (y as usize * self.width as usize + x as usize) * 4;
        let px = self.pixels.as_ref()?.get(start..start + 4)?;
        Some([px[0], px[1], px[2], px[3]])
    }

    /// Converts to an 8-bit image with rows in file order.
    pub fn to_rgba_image(&self) -> Option<RgbaImage> {
        let pixels = self.pixels.as_ref()?;
        let row_len = self.width as usize * 4;
        let mut rows = Vec::with_capacity(pixels.len());
        for row in pixels.chunks_exact(row_len.max(1)).rev() {
            rows.extend(row.iter().map(|&v| (v.clamp(0.0, 1.0) * 255.0).round() as u8));
        }
        RgbaImage::from_raw(self.width, self.height, rows)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DecodedCel {
    pub cel_idx: usize,
    pub levels: Vec<DecodedLevel>,
    pub has_alpha: bool,
}

impl DecodedCel {
    /// Name used for the cel's image: `<mat stem>` for cel 0,
    /// `<mat stem>_cel_<n>` otherwise.
    pub fn image_name(&self, mat_name: &str) -> String {
        let stem = Path::new(mat_name)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| mat_name.to_string());
        if self.cel_idx > 0 {
            format!("{}_cel_{}", stem, self.cel_idx)
        } else {
            stem
        }
    }
}

fn channel_mask(bits: u32) -> u32 {
    match bits {
        0 => 0,
        1..=31 => (1u32 << bits) - 1,
        _ => u32::MAX,
    }
}

fn decode_channel(pixel: u32, bits: u32, shl: u32, shr: u32) -> u8 {
    let value = pixel.checked_shr(shl).unwrap_or(0) & channel_mask(bits);
    value.checked_shl(shr).unwrap_or(0).min(255) as u8
}

fn unit(value: u8) -> f32 {
    value as f32 / 255.0
}

/// Decodes one little-endian packed pixel to linear RGBA.
pub fn decode_pixel(pixel: u32, cf: &ColorFormat) -> [f32; 4] {
    let r = decode_channel(pixel, cf.red_bpp, cf.red_shl, cf.red_shr);
    let g = decode_channel(pixel, cf.green_bpp, cf.green_shl, cf.green_shr);
    let b = decode_channel(pixel, cf.blue_bpp, cf.blue_shl, cf.blue_shr);
    let a = match cf.alpha_bpp {
        0 => 1.0,
        1 => {
            if decode_channel(pixel, 1, cf.alpha_shl, cf.alpha_shr) > 0 {
                1.0
            } else {
                0.0
            }
        }
        bits => unit(decode_channel(pixel, bits, cf.alpha_shl, cf.alpha_shr)),
    };
    [unit(r), unit(g), unit(b), a]
}

fn decode_packed(data: &[u8], width: u32, height: u32, cf: &ColorFormat) -> Vec<f32> {
    let pixel_size = cf.bytes_per_pixel();
    if !(1..=4).contains(&pixel_size) {
        return Vec::new();
    }
    let row_len = width as usize * pixel_size;
    let mut out = Vec::with_capacity(data.len() / pixel_size * 4);
    for row in data.chunks_exact(row_len.max(1)).take(height as usize).rev() {
        for raw in row.chunks_exact(pixel_size) {
            let mut bytes = [0u8; 4];
            bytes[..pixel_size].copy_from_slice(raw);
            out.extend_from_slice(&decode_pixel(u32::from_le_bytes(bytes), cf));
        }
    }
    out
}

fn decode_indexed(data: &[u8], width: u32, height: u32, cmp: &ColorMap) -> Result<Vec<f32>> {
    let row_len = width as usize;
    let mut out = Vec::with_capacity(data.len() * 4);
    for row in data.chunks_exact(row_len.max(1)).take(height as usize).rev() {
        for &idx in row {
            let color = cmp.color(idx).ok_or_else(|| {
                SithError::invalid_format("CMP", format!("palette has no entry {}", idx))
            })?;
            out.extend_from_slice(&color.to_linear(1.0));
        }
    }
    Ok(out)
}

impl Mat {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self::read(&mut BufReader::new(file), name)
    }

    pub fn from_bytes(data: &[u8], name: impl Into<String>) -> Result<Self> {
        Self::read(&mut Cursor::new(data), name)
    }

    pub fn read<R: Read + Seek>(reader: &mut R, name: impl Into<String>) -> Result<Self> {
        let header = read_header(reader)?;

        let mut records = Vec::new();
        for _ in 0..header.record_count {
            let record = match header.mat_type {
                MatType::Color => MatRecord::Color(MatColorRecord::read(reader)?),
                MatType::Texture => MatRecord::Texture(MatTextureRecord::read(reader)?),
            };
            records.push(record);
        }

        let mut textures = Vec::new();
        if header.mat_type == MatType::Texture {
            for idx in 0..header.texture_count {
                textures.push(read_texture(reader, &header.color_format, idx)?);
            }
        }

        Ok(Self {
            name: name.into(),
            header,
            records,
            textures,
        })
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = File::create(path.as_ref())?;
        let mut w = BufWriter::new(file);
        self.write(&mut w)?;
        w.flush()?;
        Ok(())
    }

    /// Writes the header, records and raw texture levels.
    pub fn write<W: Write + Seek>(&self, writer: &mut W) -> Result<()> {
        if self.records.len() != self.header.record_count as usize {
            return Err(SithError::invalid_format(
                "MAT",
                format!(
                    "header declares {} records but the material has {}",
                    self.header.record_count,
                    self.records.len()
                ),
            ));
        }

        RawMatHeader {
            magic: *MAT_MAGIC,
            version: self.header.version,
            mat_type: self.header.mat_type as u32,
            record_count: self.header.record_count,
            texture_count: self.header.texture_count,
            color_format: self.header.color_format,
        }
        .write(writer)?;

        for record in &self.records {
            match (record, self.header.mat_type) {
                (MatRecord::Color(r), MatType::Color) => r.write(writer)?,
                (MatRecord::Texture(r), MatType::Texture) => r.write(writer)?,
                _ => {
                    return Err(SithError::invalid_format(
                        "MAT",
                        format!("record {:?} does not match material type {:?}", record, self.header.mat_type),
                    ))
                }
            }
        }

        for texture in &self.textures {
            texture.header.write(writer)?;
            for level in &texture.levels {
                writer.write_all(level)?;
            }
        }
        Ok(())
    }

    pub fn cel_count(&self) -> usize {
        match self.header.mat_type {
            MatType::Color => self.records.len(),
            MatType::Texture => self.textures.len(),
        }
    }

    /// Decodes up to `max_cels` cels to linear RGBA.
    ///
    /// Color materials produce a 64x64 swatch per record. Without `cmp`, indexed
    /// data cannot be resolved and only the image dimensions are kept.
    pub fn decode(&self, cmp: Option<&ColorMap>, max_cels: usize) -> Result<Vec<DecodedCel>> {
        let cf = &self.header.color_format;
        if cmp.is_none() && (self.header.mat_type == MatType::Color || cf.is_indexed()) {
            tracing::warn!("missing color map for '{}', only texture size will be loaded", self.name);
        }

        let mut cels = Vec::new();
        match self.header.mat_type {
            MatType::Color => {
                for (cel_idx, record) in self.records.iter().take(max_cels).enumerate() {
                    let MatRecord::Color(record) = record else {
                        continue;
                    };
                    let pixels = match cmp {
                        Some(cmp) => Some(color_swatch(cmp, record.color_index)?),
                        None => None,
                    };
                    cels.push(DecodedCel {
                        cel_idx,
                        levels: vec![DecodedLevel {
                            width: COLOR_SWATCH_SIZE,
                            height: COLOR_SWATCH_SIZE,
                            pixels,
                        }],
                        has_alpha: false,
                    });
                }
            }
            MatType::Texture => {
                for (cel_idx, texture) in self.textures.iter().take(max_cels).enumerate() {
                    let mut levels = Vec::with_capacity(texture.levels.len());
                    for (level, data) in texture.levels.iter().enumerate() {
                        let (width, height) = texture.header.level_size(level as u32);
                        let pixels = match (cf.is_indexed(), cmp) {
                            (true, Some(cmp)) => Some(decode_indexed(data, width, height, cmp)?),
                            (true, None) => None,
                            (false, _) => Some(decode_packed(data, width, height, cf)),
                        };
                        levels.push(DecodedLevel { width, height, pixels });
                    }
                    cels.push(DecodedCel {
                        cel_idx,
                        levels,
                        has_alpha: cf.has_alpha(),
                    });
                }
            }
        }
        Ok(cels)
    }
}

fn color_swatch(cmp: &ColorMap, color_index: i32) -> Result<Vec<f32>> {
    let color = u8::try_from(color_index)
        .ok()
        .and_then(|idx| cmp.color(idx))
        .ok_or_else(|| {
            SithError::invalid_format("MAT", format!("color index {} is outside the palette", color_index))
        })?;
    let count = (COLOR_SWATCH_SIZE * COLOR_SWATCH_SIZE) as usize;
    Ok(color.to_linear(1.0).repeat(count))
}

fn read_header<R: Read + Seek>(reader: &mut R) -> Result<MatHeader> {
    let raw = RawMatHeader::read(reader)?;
    if &raw.magic != MAT_MAGIC {
        return Err(SithError::InvalidMagic {
            format: "MAT",
            expected: String::from_utf8_lossy(MAT_MAGIC).into_owned(),
            found: String::from_utf8_lossy(&raw.magic).into_owned(),
        });
    }
    if raw.version != MAT_VERSION {
        return Err(SithError::UnsupportedVersion {
            format: "MAT",
            version: format!("0x{:x}", raw.version),
        });
    }
    let mat_type = MatType::from_u32(raw.mat_type)
        .ok_or_else(|| SithError::invalid_format("MAT", format!("invalid file type {}", raw.mat_type)))?;
    if mat_type == MatType::Texture && raw.record_count != raw.texture_count {
        return Err(SithError::invalid_format(
            "MAT",
            format!(
                "record count {} and texture count {} mismatch",
                raw.record_count, raw.texture_count
            ),
        ));
    }
    if raw.record_count <= 0 {
        return Err(SithError::invalid_format("MAT", "file contains no records"));
    }

    let cf = raw.color_format;
    if ColorMode::from_u32(cf.color_mode).is_none() {
        return Err(SithError::invalid_format("MAT", format!("invalid color mode {}", cf.color_mode)));
    }
    if !matches!(cf.bpp, 8 | 16 | 24 | 32) {
        return Err(SithError::invalid_format("MAT", format!("invalid color depth {}", cf.bpp)));
    }

    Ok(MatHeader {
        version: raw.version,
        mat_type,
        record_count: raw.record_count,
        texture_count: raw.texture_count,
        color_format: cf,
    })
}

fn read_texture<R: Read + Seek>(reader: &mut R, cf: &ColorFormat, idx: i32) -> Result<MatTexture> {
    let header = MipmapHeader::read(reader)?;
    if header.width <= 0 || header.height <= 0 || header.levels < 0 {
        return Err(SithError::invalid_format(
            "MAT",
            format!(
                "texture {} has invalid size {}x{} with {} levels",
                idx, header.width, header.height, header.levels
            ),
        ));
    }

    let mut levels = Vec::new();
    for level in 0..header.levels as u32 {
        let (w, h) = header.level_size(level);
        if w == 0 && h == 0 {
            return Err(SithError::invalid_format(
                "MAT",
                format!("texture {} has more mipmap levels than its size allows", idx),
            ));
        }
        let size = (w as usize)
            .checked_mul(h as usize)
            .and_then(|n| n.checked_mul(cf.bytes_per_pixel()))
            .and_then(|n| u64::try_from(n).ok())
            .ok_or_else(|| {
                SithError::invalid_format("MAT", format!("texture {} level {} is too large", idx, level))
            })?;
        let mut data = Vec::new();
        reader.by_ref().take(size).read_to_end(&mut data)?;
        if data.len() as u64 != size {
            return Err(SithError::invalid_format(
                "MAT",
                format!("texture {} level {} is truncated", idx, level),
            ));
        }
        levels.push(data);
    }
    Ok(MatTexture { header, levels })
}
