use proptest::{collection::vec, option, prelude::*};
use resfile::{ReadOptions, ResLoad, ResReader, ResSave, ResWriter, Result, WriteOptions};
use std::{
    io::{Read, Seek},
    rc::Rc,
};

#[derive(Debug, PartialEq)]
struct Leaf {
    value: u32,
}

impl ResLoad for Leaf {
    fn load<R: Read + Seek>(loader: &mut ResReader<R>) -> Result<Self> {
        Ok(Leaf {
            value: loader.read_u32()?,
        })
    }
}

impl ResSave for Leaf {
    fn save(&self, saver: &mut ResWriter) -> Result<()> {
        saver.write_u32(self.value)
    }
}

/// A list of record fields, any of which may point at the same leaf.
struct Fields {
    refs: Vec<Option<Rc<Leaf>>>,
}

impl ResLoad for Fields {
    fn load<R: Read + Seek>(loader: &mut ResReader<R>) -> Result<Self> {
        let count = loader.read_u32()?;
        let mut refs = Vec::new();
        for _ in 0..count {
            refs.push(loader.load()?);
        }
        Ok(Fields { refs })
    }
}

impl ResSave for Fields {
    fn save(&self, saver: &mut ResWriter) -> Result<()> {
        saver.write_u32(self.refs.len() as u32)?;
        for field in &self.refs {
            saver.save_record(field.as_ref())?;
        }
        Ok(())
    }
}

/// One element of a list, also referenced on its own before the list.
struct Member {
    single: Option<Rc<Leaf>>,
    list: Vec<Rc<Leaf>>,
}

impl ResLoad for Member {
    fn load<R: Read + Seek>(loader: &mut ResReader<R>) -> Result<Self> {
        let single = loader.load()?;
        let count = loader.read_u32()? as usize;
        let list = loader.load_list(count, None)?;
        Ok(Member { single, list })
    }
}

impl ResSave for Member {
    fn save(&self, saver: &mut ResWriter) -> Result<()> {
        saver.save_record(self.single.as_ref())?;
        saver.write_u32(self.list.len() as u32)?;
        saver.save_list(&self.list)
    }
}

fn leaves(values: &[u32]) -> Vec<Rc<Leaf>> {
    values.iter().map(|&value| Rc::new(Leaf { value })).collect()
}

fn fields() -> impl Strategy<Value = (Vec<u32>, Vec<Option<usize>>)> {
    (1usize..6).prop_flat_map(|n| (vec(any::<u32>(), n), vec(option::of(0..n), 0..16)))
}

proptest! {
    #[test]
    fn sharing_is_preserved((values, picks) in fields()) {
        let pool = leaves(&values);
        let input = Fields {
            refs: picks.iter().map(|p| p.map(|i| Rc::clone(&pool[i]))).collect(),
        };

        let data = resfile::to_bytes(&input, WriteOptions::default()).unwrap();
        let output: Fields = resfile::from_data(&data[..], ReadOptions::default()).unwrap();
        prop_assert_eq!(output.refs.len(), input.refs.len());

        for (a, b) in input.refs.iter().zip(&output.refs) {
            prop_assert_eq!(a.as_deref(), b.as_deref());
        }
        for i in 0..input.refs.len() {
            for j in 0..input.refs.len() {
                if let (Some(a), Some(b)) = (&input.refs[i], &input.refs[j]) {
                    let loaded = (output.refs[i].as_ref().unwrap(), output.refs[j].as_ref().unwrap());
                    prop_assert_eq!(Rc::ptr_eq(a, b), Rc::ptr_eq(loaded.0, loaded.1));
                }
            }
        }
    }

    #[test]
    fn record_saved_before_its_list_joins_it(
        (values, pick) in vec(any::<u32>(), 1..8).prop_flat_map(|v| {
            let n = v.len();
            (Just(v), 0..n)
        })
    ) {
        let list = leaves(&values);
        let input = Member {
            single: Some(Rc::clone(&list[pick])),
            list,
        };

        let data = resfile::to_bytes(&input, WriteOptions::default()).unwrap();
        // two fields and a count, then every leaf once
        prop_assert_eq!(data.len(), 12 + 4 * values.len());

        let output: Member = resfile::from_data(&data[..], ReadOptions::default()).unwrap();
        prop_assert!(Rc::ptr_eq(output.single.as_ref().unwrap(), &output.list[pick]));
        let loaded: Vec<u32> = output.list.iter().map(|l| l.value).collect();
        prop_assert_eq!(loaded, values);
    }
}
