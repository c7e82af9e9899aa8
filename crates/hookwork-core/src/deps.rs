//! Dependency lists and the shallow comparison shared by every memoizing hook.
//!
//! A [`Dep`] is either a primitive compared by value or a handle compared by
//! pointer identity. Memo slots, callback slots, effect slots, memoized props
//! and context values all go through [`shallow_equal`].

use smallvec::SmallVec;
use std::any::Any;
use std::fmt;
use std::rc::Rc;

/// Pointer identity of an `Rc`-backed value.
///
/// The allocation is kept alive so the address cannot be recycled while the
/// dependency list still refers to it.
#[derive(Clone)]
pub struct Identity {
    addr: *const (),
    _keep_alive: Rc<dyn Any>,
}

impl Identity {
    pub fn of<T: ?Sized + 'static>(value: &Rc<T>) -> Self {
        Self {
            addr: Rc::as_ptr(value) as *const (),
            _keep_alive: Rc::new(Rc::clone(value)),
        }
    }

    pub fn addr(&self) -> *const () {
        self.addr
    }
}

impl PartialEq for Identity {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.addr, other.addr)
    }
}

impl Eq for Identity {}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Identity({:p})", self.addr)
    }
}

/// One entry of a dependency list.
#[derive(Clone, Debug)]
pub enum Dep {
    Nil,
    Unit,
    Bool(bool),
    Int(i64),
    Uint(u64),
    /// Compared bit-for-bit, so `NaN` equals itself and `0.0` differs from `-0.0`.
    Float(f64),
    Str(Rc<str>),
    Ref(Identity),
}

impl PartialEq for Dep {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Dep::Nil, Dep::Nil) | (Dep::Unit, Dep::Unit) => true,
            (Dep::Bool(a), Dep::Bool(b)) => a == b,
            (Dep::Int(a), Dep::Int(b)) => a == b,
            (Dep::Uint(a), Dep::Uint(b)) => a == b,
            (Dep::Float(a), Dep::Float(b)) => a.to_bits() == b.to_bits(),
            (Dep::Str(a), Dep::Str(b)) => a == b,
            (Dep::Ref(a), Dep::Ref(b)) => a == b,
            _ => false,
        }
    }
}

/// Converts a value into the [`Dep`] it is tracked as.
pub trait Dependency {
    fn to_dep(&self) -> Dep;
}

impl<T: Dependency + ?Sized> Dependency for &T {
    fn to_dep(&self) -> Dep {
        (**self).to_dep()
    }
}

impl Dependency for () {
    fn to_dep(&self) -> Dep {
        Dep::Unit
    }
}

impl Dependency for bool {
    fn to_dep(&self) -> Dep {
        Dep::Bool(*self)
    }
}

macro_rules! signed_dependency {
    ($($ty:ty),*) => {
        $(impl Dependency for $ty {
            fn to_dep(&self) -> Dep {
                Dep::Int(*self as i64)
            }
        })*
    };
}

macro_rules! unsigned_dependency {
    ($($ty:ty),*) => {
        $(impl Dependency for $ty {
            fn to_dep(&self) -> Dep {
                Dep::Uint(*self as u64)
            }
        })*
    };
}

signed_dependency!(i8, i16, i32, i64, isize);
unsigned_dependency!(u8, u16, u32, u64, usize);

impl Dependency for char {
    fn to_dep(&self) -> Dep {
        Dep::Uint(*self as u64)
    }
}

impl Dependency for f32 {
    fn to_dep(&self) -> Dep {
        Dep::Float(f64::from(*self))
    }
}

impl Dependency for f64 {
    fn to_dep(&self) -> Dep {
        Dep::Float(*self)
    }
}

impl Dependency for str {
    fn to_dep(&self) -> Dep {
        Dep::Str(Rc::from(self))
    }
}

impl Dependency for String {
    fn to_dep(&self) -> Dep {
        Dep::Str(Rc::from(self.as_str()))
    }
}

impl<T: Dependency> Dependency for Option<T> {
    fn to_dep(&self) -> Dep {
        match self {
            Some(value) => value.to_dep(),
            None => Dep::Nil,
        }
    }
}

/// Reference-typed values are tracked by identity, never by contents.
impl<T: ?Sized + 'static> Dependency for Rc<T> {
    fn to_dep(&self) -> Dep {
        Dep::Ref(Identity::of(self))
    }
}

/// Ordered dependency list supplied to a memoizing hook.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Deps(SmallVec<[Dep; 4]>);

impl Deps {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, dep: Dep) {
        self.0.push(dep);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Dep> {
        self.0.iter()
    }
}

impl FromIterator<Dep> for Deps {
    fn from_iter<I: IntoIterator<Item = Dep>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Builds a supplied dependency list: `deps![count, name]`.
///
/// `deps![]` is the empty list (compute once); pass `None` to recompute on
/// every render.
#[macro_export]
macro_rules! deps {
    ($($dep:expr),* $(,)?) => {{
        #[allow(unused_mut)]
        let mut deps = $crate::Deps::new();
        $(deps.push($crate::Dependency::to_dep(&$dep));)*
        ::std::option::Option::Some(deps)
    }};
}

/// Shallow equality over two dependency lists.
///
/// Absent lists never compare equal, not even to each other.
pub fn shallow_equal(prev: Option<&Deps>, next: Option<&Deps>) -> bool {
    match (prev, next) {
        (Some(prev), Some(next)) => {
            prev.len() == next.len() && prev.iter().zip(next.iter()).all(|(a, b)| a == b)
        }
        _ => false,
    }
}

/// A component's prop set, as compared by memoized components.
pub trait Props: 'static {
    fn prop_deps(&self) -> Deps;
}

impl Props for () {
    fn prop_deps(&self) -> Deps {
        Deps::new()
    }
}

macro_rules! tuple_props {
    ($($name:ident),+) => {
        impl<$($name: Dependency + 'static),+> Props for ($($name,)+) {
            #[allow(non_snake_case)]
            fn prop_deps(&self) -> Deps {
                let ($($name,)+) = self;
                let mut deps = Deps::new();
                $(deps.push($name.to_dep());)+
                deps
            }
        }
    };
}

tuple_props!(A);
tuple_props!(A, B);
tuple_props!(A, B, C);
tuple_props!(A, B, C, D);
tuple_props!(A, B, C, D, E);
tuple_props!(A, B, C, D, E, F);
