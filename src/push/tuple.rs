//! Tuple strategy - every element left to right, slot counts summed

use super::Push;
use crate::runtime::State;

impl Push for () {
    #[inline]
    fn push(self, _state: &mut State) -> i32 {
        0
    }
}

macro_rules! impl_push_tuple {
    ($($name:ident)+) => {
        impl<$($name: Push),+> Push for ($($name,)+) {
            #[allow(non_snake_case)]
            fn push(self, state: &mut State) -> i32 {
                let ($($name,)+) = self;
                let mut slots = 0;
                $(slots += $name.push(state);)+
                slots
            }
        }
    };
}

impl_push_tuple!(A);
impl_push_tuple!(A B);
impl_push_tuple!(A B C);
impl_push_tuple!(A B C D);
impl_push_tuple!(A B C D E);
impl_push_tuple!(A B C D E F);
impl_push_tuple!(A B C D E F G);
impl_push_tuple!(A B C D E F G H);
impl_push_tuple!(A B C D E F G H I);
impl_push_tuple!(A B C D E F G H I J);
impl_push_tuple!(A B C D E F G H I J K);
impl_push_tuple!(A B C D E F G H I J K L);
