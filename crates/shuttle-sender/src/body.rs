//! # Message Bodies
//!
//! Every payload handed to the sender names itself. The name becomes the
//! envelope's `type` property, which consumers use to pick a handler.
//!
//! Smart pointers and references delegate to the value they point at, so
//! `&Order`, `Box<Order>` and `Arc<Order>` are all tagged `Order`.

use serde::Serialize;
use std::borrow::Cow;
use std::rc::Rc;
use std::sync::Arc;

/// A payload that can be marshalled and tagged with its message type.
pub trait MessageBody: Serialize {
    /// Type tag stored under the envelope's `type` property.
    fn message_type(&self) -> Cow<'static, str>;
}

impl<T: MessageBody + ?Sized> MessageBody for &T {
    fn message_type(&self) -> Cow<'static, str> {
        (**self).message_type()
    }
}

impl<T: MessageBody + ?Sized> MessageBody for &mut T {
    fn message_type(&self) -> Cow<'static, str> {
        (**self).message_type()
    }
}

impl<T: MessageBody + ?Sized> MessageBody for Box<T> {
    fn message_type(&self) -> Cow<'static, str> {
        (**self).message_type()
    }
}

impl<T: MessageBody + ?Sized> MessageBody for Arc<T> {
    fn message_type(&self) -> Cow<'static, str> {
        (**self).message_type()
    }
}

impl<T: MessageBody + ?Sized> MessageBody for Rc<T> {
    fn message_type(&self) -> Cow<'static, str> {
        (**self).message_type()
    }
}

impl MessageBody for str {
    fn message_type(&self) -> Cow<'static, str> {
        Cow::Borrowed("string")
    }
}

impl MessageBody for String {
    fn message_type(&self) -> Cow<'static, str> {
        Cow::Borrowed("string")
    }
}

impl MessageBody for serde_json::Value {
    fn message_type(&self) -> Cow<'static, str> {
        Cow::Borrowed("Value")
    }
}

macro_rules! primitive_bodies {
    ($($ty:ty),* $(,)?) => {
        $(
            impl MessageBody for $ty {
                fn message_type(&self) -> Cow<'static, str> {
                    Cow::Borrowed(stringify!($ty))
                }
            }
        )*
    };
}

primitive_bodies!(bool, i8, i16, i32, i64, u8, u16, u32, u64, f32, f64);

/// Implement [`MessageBody`] for a serializable type.
///
/// The tag defaults to the type's identifier; pass `=> "tag"` to override it.
///
/// ```rust,ignore
/// #[derive(serde::Serialize)]
/// struct OrderPlaced { id: u64 }
/// shuttle_sender::message_body!(OrderPlaced);
///
/// #[derive(serde::Serialize)]
/// struct Refund { id: u64 }
/// shuttle_sender::message_body!(Refund => "billing.refund");
/// ```
#[macro_export]
macro_rules! message_body {
    ($ty:ident) => {
        $crate::message_body!($ty => stringify!($ty));
    };
    ($ty:ty => $tag:expr) => {
        impl $crate::MessageBody for $ty {
            fn message_type(&self) -> ::std::borrow::Cow<'static, str> {
                ::std::borrow::Cow::Borrowed($tag)
            }
        }
    };
}
