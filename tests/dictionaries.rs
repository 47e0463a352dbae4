use resfile::{ReadOptions, ResDict, ResLoad, ResReader, ResSave, ResWriter, Result, WriteOptions};
use std::{
    io::{Read, Seek},
    rc::Rc,
};

#[derive(Debug, PartialEq)]
struct Slot {
    value: u32,
}

impl ResLoad for Slot {
    fn load<R: Read + Seek>(loader: &mut ResReader<R>) -> Result<Self> {
        Ok(Slot {
            value: loader.read_u32()?,
        })
    }
}

impl ResSave for Slot {
    fn save(&self, saver: &mut ResWriter) -> Result<()> {
        saver.write_u32(self.value)
    }
}

/// Stores its members as plain pairs and only builds a dictionary while saving.
#[derive(Debug, PartialEq)]
struct Group {
    members: Vec<(String, u32)>,
}

impl ResLoad for Group {
    fn load<R: Read + Seek>(loader: &mut ResReader<R>) -> Result<Self> {
        let dict: ResDict<Slot> = loader.load_dict()?;
        Ok(Group {
            members: dict
                .iter()
                .map(|(name, slot)| (name.to_owned(), slot.value))
                .collect(),
        })
    }
}

impl ResSave for Group {
    fn save(&self, saver: &mut ResWriter) -> Result<()> {
        let dict: ResDict<Slot> = self
            .members
            .iter()
            .map(|(name, value)| (name.as_str(), Rc::new(Slot { value: *value })))
            .collect();
        saver.save_dict(&dict)
    }
}

struct Groups {
    groups: Vec<Rc<Group>>,
}

impl ResLoad for Groups {
    fn load<R: Read + Seek>(loader: &mut ResReader<R>) -> Result<Self> {
        let count = loader.read_u32()? as usize;
        Ok(Groups {
            groups: loader.load_list(count, None)?,
        })
    }
}

impl ResSave for Groups {
    fn save(&self, saver: &mut ResWriter) -> Result<()> {
        saver.write_u32(self.groups.len() as u32)?;
        saver.save_list(&self.groups)
    }
}

fn group(members: &[(&str, u32)]) -> Rc<Group> {
    Rc::new(Group {
        members: members
            .iter()
            .map(|&(name, value)| (name.to_owned(), value))
            .collect(),
    })
}

#[test]
fn dictionaries_built_while_saving_keep_their_keys() {
    let input = Groups {
        groups: vec![
            group(&[("a", 1), ("b", 2)]),
            group(&[("x", 3), ("y", 4)]),
        ],
    };

    let data = resfile::to_bytes(&input, WriteOptions::default()).unwrap();
    let output: Groups = resfile::from_data(&data[..], ReadOptions::default()).unwrap();

    assert_eq!(output.groups.len(), 2);
    assert_eq!(*output.groups[0], *input.groups[0]);
    assert_eq!(*output.groups[1], *input.groups[1]);
}

#[test]
fn equal_key_lists_share_one_key_index() {
    let input = Groups {
        groups: vec![
            group(&[("left", 1), ("right", 2)]),
            group(&[("left", 5), ("right", 6)]),
        ],
    };

    let data = resfile::to_bytes(&input, WriteOptions::default()).unwrap();
    let output: Groups = resfile::from_data(&data[..], ReadOptions::default()).unwrap();
    assert_eq!(*output.groups[1], *input.groups[1]);

    // both key-index fields sit at the start of their group and point at the same bytes
    let field = |position: usize| {
        let delta = i32::from_le_bytes([
            data[position],
            data[position + 1],
            data[position + 2],
            data[position + 3],
        ]);
        position as i64 + i64::from(delta)
    };
    let first_group = field(4) as usize;
    let second_group = first_group + 8;
    assert_eq!(field(first_group), field(second_group));
}
