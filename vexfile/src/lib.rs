//! On-disk `.vex` image format: a length-prefixed data segment followed by
//! the raw instruction stream, unchanged from the teacher's `Program`
//! save/load algorithm aside from the rename to `Image`.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::prelude::*;
use std::io::{BufReader, BufWriter};
use std::fs::File;
use std::path::Path;

#[derive(Debug, PartialEq)]
pub struct Image {
    data: Vec<u8>,
    instructions: Vec<u8>,
}

impl Image {
    pub fn from(data: Vec<u8>, instructions: Vec<u8>) -> Image {
        Image { data, instructions }
    }

    pub fn copy_from(data: &[u8], instructions: &[u8]) -> Image {
        Image {
            data: Vec::from(data),
            instructions: Vec::from(instructions),
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data[..]
    }

    pub fn instructions(&self) -> &[u8] {
        &self.instructions[..]
    }
}

pub fn read<R: Read>(reader: &mut R) -> std::io::Result<Image> {
    let data_length = reader.read_u32::<LittleEndian>()?;
    let mut data = vec![0; data_length as usize];
    reader.read_exact(&mut data)?;

    let mut instructions = Vec::new();
    reader.read_to_end(&mut instructions)?;

    Ok(Image::from(data, instructions))
}

pub fn write<W: Write>(writer: &mut W, image: &Image) -> std::io::Result<()> {
    writer.write_u32::<LittleEndian>(image.data.len() as u32)?;
    writer.write_all(&image.data[..])?;
    writer.write_all(&image.instructions[..])?;
    Ok(())
}

pub trait ReadVexExt: Read + Sized {
    fn read_vex(&mut self) -> std::io::Result<Image> {
        read(self)
    }
}

impl<R: Read + Sized> ReadVexExt for R { }

pub trait WriteVexExt: Write + Sized {
    fn write_vex(&mut self, image: &Image) -> std::io::Result<()> {
        write(self, image)
    }
}

impl<W: Write + Sized> WriteVexExt for W { }

pub fn read_file<P: AsRef<Path>>(path: P) -> std::io::Result<Image> {
    BufReader::new(File::open(path)?).read_vex()
}

pub fn write_file<P: AsRef<Path>>(path: P, image: &Image) -> std::io::Result<()> {
    BufWriter::new(File::create(path)?).write_vex(image)
}

#[cfg(test)]
mod test;
