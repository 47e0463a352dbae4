//! A small model file schema used by the integration tests.
//!
//! Header layout (32 bytes):
//!
//! | offset | field                                  |
//! |--------|----------------------------------------|
//! | 0      | signature `RMDL`                       |
//! | 4      | version, always big endian             |
//! | 8      | file size, always big endian           |
//! | 12     | name                                   |
//! | 16     | model dictionary (keys, values)        |
//! | 24     | texture count                          |
//! | 28     | textures                               |

#![allow(dead_code)]

use resfile::{Endianness, Patch, ResDict, ResLoad, ResReader, ResSave, ResWriter, Result, WriteOptions};
use std::{
    io::{Read, Seek},
    rc::Rc,
};

pub const SIGNATURE: &[u8; 4] = b"RMDL";
pub const SIZE_FIELD: u64 = 8;
pub const PIXELS: [u8; 8] = [0xc0, 0xff, 0xee, 0x11, 0x22, 0x33, 0x44, 0x55];

#[derive(Debug, PartialEq)]
pub struct Texture {
    pub name: Option<String>,
    pub width: u16,
    pub height: u16,
    pub pixels: Option<Rc<[u8]>>,
}

#[derive(Debug, PartialEq)]
pub struct Material {
    pub name: Option<String>,
    pub albedo: Option<Rc<Texture>>,
    pub normal: Option<Rc<Texture>>,
    pub params: Option<Rc<[f32]>>,
}

#[derive(Debug, PartialEq)]
pub struct Bone {
    pub name: Option<String>,
    pub index: u32,
    pub translation: [f32; 3],
}

#[derive(Debug, PartialEq)]
pub struct Model {
    pub name: Option<String>,
    pub skeleton: Option<Rc<Bone>>,
    pub bones: Vec<Rc<Bone>>,
    pub materials: Vec<Rc<Material>>,
}

#[derive(Debug, PartialEq)]
pub struct ModelFile {
    pub version: u32,
    pub name: Option<String>,
    pub models: ResDict<Model>,
    pub textures: Vec<Rc<Texture>>,
}

impl ResLoad for Texture {
    fn load<R: Read + Seek>(loader: &mut ResReader<R>) -> Result<Self> {
        let name = loader.load_string(None)?;
        let width = loader.read_u16()?;
        let height = loader.read_u16()?;
        let len = loader.read_u32()? as usize;
        let pixels: Option<Rc<[u8]>> = loader
            .load_custom(|r| r.read_bytes(len), None)?
            .map(Rc::from);
        Ok(Texture {
            name,
            width,
            height,
            pixels,
        })
    }
}

impl ResSave for Texture {
    fn save(&self, saver: &mut ResWriter) -> Result<()> {
        saver.save_string(self.name.as_deref(), None)?;
        saver.write_u16(self.width)?;
        saver.write_u16(self.height)?;
        saver.write_u32(self.pixels.as_ref().map_or(0, |p| p.len() as u32))?;
        saver.save_bytes(self.pixels.as_ref(), 16)
    }
}

impl ResLoad for Material {
    fn load<R: Read + Seek>(loader: &mut ResReader<R>) -> Result<Self> {
        Ok(Material {
            name: loader.load_string(None)?,
            albedo: loader.load()?,
            normal: loader.load()?,
            params: loader
                .load_custom(
                    |r| {
                        let count = r.read_u32()? as usize;
                        r.read_array::<f32>(count)
                    },
                    None,
                )?
                .map(Rc::from),
        })
    }
}

impl ResSave for Material {
    fn save(&self, saver: &mut ResWriter) -> Result<()> {
        saver.save_string(self.name.as_deref(), None)?;
        saver.save_record(self.albedo.as_ref())?;
        saver.save_record(self.normal.as_ref())?;
        saver.save_custom(self.params.as_ref(), |w, params: &[f32]| {
            w.write_u32(params.len() as u32)?;
            w.write_array(params)
        })
    }
}

impl ResLoad for Bone {
    fn load<R: Read + Seek>(loader: &mut ResReader<R>) -> Result<Self> {
        Ok(Bone {
            name: loader.load_string(None)?,
            index: loader.read_u32()?,
            translation: [loader.read_f32()?, loader.read_f32()?, loader.read_f32()?],
        })
    }
}

impl ResSave for Bone {
    fn save(&self, saver: &mut ResWriter) -> Result<()> {
        saver.save_string(self.name.as_deref(), None)?;
        saver.write_u32(self.index)?;
        saver.write_array(&self.translation)
    }
}

impl ResLoad for Model {
    fn load<R: Read + Seek>(loader: &mut ResReader<R>) -> Result<Self> {
        let name = loader.load_string(None)?;
        let skeleton = loader.load()?;
        let bone_count = loader.read_u32()? as usize;
        let bones = loader.load_list(bone_count, None)?;
        let material_count = loader.read_u32()? as usize;
        let materials = loader.load_list(material_count, None)?;
        Ok(Model {
            name,
            skeleton,
            bones,
            materials,
        })
    }
}

impl ResSave for Model {
    fn save(&self, saver: &mut ResWriter) -> Result<()> {
        saver.save_string(self.name.as_deref(), None)?;
        // queued before the list that contains it
        saver.save_record(self.skeleton.as_ref())?;
        saver.write_u32(self.bones.len() as u32)?;
        saver.save_list(&self.bones)?;
        saver.write_u32(self.materials.len() as u32)?;
        saver.save_list(&self.materials)
    }
}

impl ResLoad for ModelFile {
    fn load<R: Read + Seek>(loader: &mut ResReader<R>) -> Result<Self> {
        loader.check_signature(SIGNATURE)?;
        let (version, _size) = loader.with_byte_order(Endianness::Big, |c| {
            Ok((c.read_u32()?, c.read_u32()?))
        })?;
        let name = loader.load_string(None)?;
        let models = loader.load_dict()?;
        let texture_count = loader.read_u32()? as usize;
        let textures = loader.load_list(texture_count, None)?;
        Ok(ModelFile {
            version,
            name,
            models,
            textures,
        })
    }
}

impl ResSave for ModelFile {
    fn save(&self, saver: &mut ResWriter) -> Result<()> {
        saver.write_signature(SIGNATURE)?;
        saver.with_byte_order(Endianness::Big, |w| {
            w.write_u32(self.version)?;
            w.reserve_u32().map(|_| ())
        })?;
        saver.save_string(self.name.as_deref(), None)?;
        saver.save_dict(&self.models)?;
        saver.write_u32(self.textures.len() as u32)?;
        saver.save_list(&self.textures)
    }
}

/// Saves `file` and fills in the size field once the layout is final.
pub fn write_sized(file: &ModelFile, options: WriteOptions) -> Result<Vec<u8>> {
    let mut writer = ResWriter::new(options);
    file.save(&mut writer)?;
    writer.finish_with(|w| {
        let len = w.len() as u32;
        w.patch_u32(
            Patch {
                position: SIZE_FIELD,
                byte_order: Endianness::Big,
            },
            len,
        )
    })
}

/// Two models sharing materials, bones and textures in every way the format allows.
pub fn sample() -> ModelFile {
    let bricks = Rc::new(Texture {
        name: Some("bricks".into()),
        width: 4,
        height: 2,
        pixels: Some(Rc::from(PIXELS.to_vec())),
    });
    let grass = Rc::new(Texture {
        name: Some("grass".into()),
        width: 1,
        height: 1,
        pixels: None,
    });

    let params: Rc<[f32]> = Rc::from(vec![0.5f32, 1.0, 2.0]);
    let stone = Rc::new(Material {
        name: Some("stone".into()),
        albedo: Some(Rc::clone(&bricks)),
        normal: None,
        params: Some(Rc::clone(&params)),
    });
    let lawn = Rc::new(Material {
        name: Some("lawn".into()),
        albedo: Some(Rc::clone(&grass)),
        normal: Some(Rc::clone(&bricks)),
        params: Some(params),
    });

    let root = Rc::new(Bone {
        name: Some("root".into()),
        index: 0,
        translation: [0.0, 0.0, 0.0],
    });
    let arm = Rc::new(Bone {
        name: Some(String::new()),
        index: 1,
        translation: [1.0, 2.0, 3.0],
    });

    let beta = Rc::new(Model {
        name: Some("Beta".into()),
        skeleton: Some(Rc::clone(&root)),
        bones: vec![root, arm],
        materials: vec![Rc::clone(&stone), lawn],
    });
    let alpha = Rc::new(Model {
        name: Some("Alpha".into()),
        skeleton: None,
        bones: Vec::new(),
        materials: vec![stone],
    });

    let mut models = ResDict::new();
    models.insert("Beta", beta);
    models.insert("Alpha", alpha);

    ModelFile {
        version: 3,
        name: Some("scene".into()),
        models,
        textures: vec![bricks, grass],
    }
}

/// Every position `needle` occurs at in `data`.
pub fn find_all(data: &[u8], needle: &[u8]) -> Vec<usize> {
    data.windows(needle.len())
        .enumerate()
        .filter(|(_, window)| *window == needle)
        .map(|(position, _)| position)
        .collect()
}
