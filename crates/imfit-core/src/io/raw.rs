//! Minimal raw pixel-buffer format standing in for FITS ingestion: an
//! 8-byte little-endian `(width: u32, height: u32)` header followed by
//! `width*height` little-endian `f64` samples in row-major order. Reads are
//! memory-mapped so large grids don't need a full-file copy.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use memmap2::Mmap;
use ndarray::Array2;

use crate::error::{Error, Result};

const RAW_HEADER_SIZE: usize = 8;

pub fn load_raw(path: &Path) -> Result<Array2<f64>> {
    let file = File::open(path)?;
    let mmap = unsafe { Mmap::map(&file)? };

    if mmap.len() < RAW_HEADER_SIZE {
        return Err(Error::InvalidDimensions { width: 0, height: 0 });
    }
    let mut cursor = std::io::Cursor::new(&mmap[..RAW_HEADER_SIZE]);
    let width = cursor.read_u32::<LittleEndian>()?;
    let height = cursor.read_u32::<LittleEndian>()?;
    if width == 0 || height == 0 {
        return Err(Error::InvalidDimensions {
            width: width as usize,
            height: height as usize,
        });
    }

    let n_pixels = width as usize * height as usize;
    let expected = RAW_HEADER_SIZE + n_pixels * std::mem::size_of::<f64>();
    if mmap.len() < expected {
        return Err(Error::InvalidDimensions {
            width: width as usize,
            height: height as usize,
        });
    }

    let mut data = Array2::<f64>::zeros((height as usize, width as usize));
    let mut cursor = std::io::Cursor::new(&mmap[RAW_HEADER_SIZE..expected]);
    for row in 0..height as usize {
        for col in 0..width as usize {
            data[[row, col]] = cursor.read_f64::<LittleEndian>()?;
        }
    }
    Ok(data)
}

pub fn save_raw(data: &Array2<f64>, path: &Path) -> Result<()> {
    let (height, width) = data.dim();
    let mut buf = Vec::with_capacity(RAW_HEADER_SIZE + height * width * std::mem::size_of::<f64>());
    buf.write_u32::<LittleEndian>(width as u32)?;
    buf.write_u32::<LittleEndian>(height as u32)?;
    for row in 0..height {
        for col in 0..width {
            buf.write_f64::<LittleEndian>(data[[row, col]])?;
        }
    }
    let mut file = File::create(path)?;
    file.write_all(&buf)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_a_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("grid.raw");
        let data = Array2::from_shape_fn((4, 5), |(r, c)| (r * 5 + c) as f64 * 1.5);
        save_raw(&data, &path).unwrap();
        let loaded = load_raw(&path).unwrap();
        assert_eq!(loaded, data);
    }

    #[test]
    fn rejects_truncated_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.raw");
        std::fs::write(&path, [1u8, 0, 0, 0, 1, 0, 0, 0]).unwrap();
        assert!(load_raw(&path).is_err());
    }
}
