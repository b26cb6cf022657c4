//! Helper macros.

/// Clone handles into a `move` closure.
///
/// ```rust,ignore
/// let sum = compute(cloned!(a, b => move || a.get() + b.get()));
/// ```
#[macro_export]
macro_rules! cloned {
    ($($n:ident),+ => $e:expr) => {
        {
            $( let $n = $n.clone(); )+
            $e
        }
    };
}

/// Declare a record whose fields are individually reactive.
///
/// Every field becomes a [`Signal`](crate::reactive::Signal) created once,
/// when the record is constructed with the generated `new`. The record
/// itself is a cheap handle: clones share the field signals, and it
/// compares by identity, so editing a field in place keeps it the same
/// list item for the reconciler.
///
/// ```rust,ignore
/// reactive_record! {
///     #[derive(Debug)]
///     pub struct CartItem {
///         pub name: String,
///         pub price: f64,
///         pub amount: u32,
///     }
/// }
///
/// let item = CartItem::new("Pants".into(), 288.0, 2);
/// item.amount.update(|n| n + 1);
/// ```
#[macro_export]
macro_rules! reactive_record {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $( $fvis:vis $field:ident : $ty:ty ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone)]
        $vis struct $name {
            $( $fvis $field: $crate::reactive::Signal<$ty>, )*
            __identity: $crate::reactive::Identity,
        }

        impl $name {
            #[allow(clippy::too_many_arguments)]
            pub fn new($( $field: $ty ),*) -> Self {
                Self {
                    $( $field: $crate::reactive::Signal::new($field), )*
                    __identity: $crate::reactive::Identity::next(),
                }
            }
        }

        impl $crate::reactive::HasIdentity for $name {
            fn identity(&self) -> $crate::reactive::Identity {
                self.__identity
            }
        }

        impl $crate::reactive::SameValue for $name {
            fn same_value(&self, other: &Self) -> bool {
                self.__identity == other.__identity
            }
        }
    };
}

/// Build a `Vec<Child>` from anything convertible into a [`Child`].
///
/// ```rust,ignore
/// div(children!["Total: ", span(children![price_label])])
/// ```
#[macro_export]
macro_rules! children {
    () => {
        ::std::vec::Vec::<$crate::component::Child>::new()
    };
    ($($child:expr),+ $(,)?) => {
        ::std::vec![$($crate::component::Child::from($child)),+]
    };
}
