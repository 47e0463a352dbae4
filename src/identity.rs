use std::{any::TypeId, rc::Rc};

/// Reference identity of a value that is kept alive for the whole save.
///
/// The address alone is not enough: a struct and its first field share an address, so the
/// type is part of the key.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct IdentityKey {
    address: usize,
    type_id: TypeId,
}

impl IdentityKey {
    pub fn of<T: ?Sized + 'static>(value: &T) -> Self {
        IdentityKey {
            address: value as *const T as *const () as usize,
            type_id: TypeId::of::<T>(),
        }
    }

    pub fn of_rc<T: ?Sized + 'static>(value: &Rc<T>) -> Self {
        IdentityKey::of::<T>(value)
    }
}
