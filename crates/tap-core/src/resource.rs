//! Resource descriptions.
//!
//! A [`Resource`] is a render function `P -> R`. A [`ResourceElement`] pairs a
//! resource with the props it should render with and an optional key; it is a
//! description, not an instance. Instances are fibers, created by a handle or
//! by a parent's `tap_resource`/`tap_resources`.

use std::any::TypeId;
use std::fmt;
use std::rc::Rc;

/// Key used to match elements to existing fibers across renders.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ResourceKey {
    Int(i64),
    Str(Rc<str>),
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKey::Int(value) => write!(f, "{value}"),
            ResourceKey::Str(value) => f.write_str(value),
        }
    }
}

macro_rules! int_key {
    ($($ty:ty),*) => {
        $(impl From<$ty> for ResourceKey {
            fn from(value: $ty) -> Self {
                ResourceKey::Int(value as i64)
            }
        })*
    };
}

int_key!(i32, i64, u32, u64, usize);

impl From<&str> for ResourceKey {
    fn from(value: &str) -> Self {
        ResourceKey::Str(Rc::from(value))
    }
}

impl From<String> for ResourceKey {
    fn from(value: String) -> Self {
        ResourceKey::Str(Rc::from(value))
    }
}

impl From<Rc<str>> for ResourceKey {
    fn from(value: Rc<str>) -> Self {
        ResourceKey::Str(value)
    }
}

/// A render function together with its identity.
///
/// Identity is the type of the function passed to [`resource`]: the same fn
/// item or closure expression yields the same resource type on every render,
/// regardless of what the closure captured.
pub struct Resource<P, R> {
    type_id: TypeId,
    name: &'static str,
    render: Rc<dyn Fn(P) -> R>,
}

/// Build a [`Resource`] from a render function.
pub fn resource<P, R, F>(render: F) -> Resource<P, R>
where
    F: Fn(P) -> R + 'static,
{
    Resource {
        type_id: TypeId::of::<F>(),
        name: std::any::type_name::<F>(),
        render: Rc::new(render),
    }
}

impl<P, R> Resource<P, R> {
    pub fn resource_type(&self) -> TypeId {
        self.type_id
    }

    /// Type name of the render function, used in logs and errors.
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn same_type(&self, other: &Resource<P, R>) -> bool {
        self.type_id == other.type_id
    }

    pub fn element(&self, props: P) -> ResourceElement<P, R> {
        ResourceElement {
            resource: self.clone(),
            props,
            key: None,
        }
    }

    pub fn keyed(&self, key: impl Into<ResourceKey>, props: P) -> ResourceElement<P, R> {
        self.element(props).with_key(key)
    }

    pub(crate) fn call(&self, props: P) -> R {
        (self.render)(props)
    }
}

impl<P, R> Clone for Resource<P, R> {
    fn clone(&self) -> Self {
        Self {
            type_id: self.type_id,
            name: self.name,
            render: Rc::clone(&self.render),
        }
    }
}

impl<P, R> fmt::Debug for Resource<P, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resource").field("name", &self.name).finish()
    }
}

/// A resource plus the props (and key) to render it with.
pub struct ResourceElement<P, R> {
    pub(crate) resource: Resource<P, R>,
    pub(crate) props: P,
    pub(crate) key: Option<ResourceKey>,
}

impl<P, R> ResourceElement<P, R> {
    pub fn with_key(mut self, key: impl Into<ResourceKey>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn resource(&self) -> &Resource<P, R> {
        &self.resource
    }

    pub fn props(&self) -> &P {
        &self.props
    }

    pub fn key(&self) -> Option<&ResourceKey> {
        self.key.as_ref()
    }

    pub fn into_props(self) -> P {
        self.props
    }
}

impl<P: Clone, R> Clone for ResourceElement<P, R> {
    fn clone(&self) -> Self {
        Self {
            resource: self.resource.clone(),
            props: self.props.clone(),
            key: self.key.clone(),
        }
    }
}

impl<P: fmt::Debug, R> fmt::Debug for ResourceElement<P, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceElement")
            .field("resource", &self.resource.name)
            .field("props", &self.props)
            .field("key", &self.key)
            .finish()
    }
}
