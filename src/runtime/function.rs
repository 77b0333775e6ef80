//! Native functions and closures

use core::fmt;
use std::rc::Rc;

use super::state::State;
use super::value::Value;

/// Native function: reads arguments from its frame, pushes results, returns how many
pub type NativeFn = fn(&mut State) -> i32;

/// Native function bound to its upvalues
pub struct Function {
    func: NativeFn,
    upvalues: Vec<Value>,
}

impl Function {
    #[inline]
    pub fn native(&self) -> NativeFn {
        self.func
    }

    #[inline]
    pub fn upvalues(&self) -> &[Value] {
        &self.upvalues
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("func", &(self.func as usize as *const ()))
            .field("upvalues", &self.upvalues.len())
            .finish()
    }
}

/// Shared handle to a function
#[derive(Debug, Clone)]
pub struct FunctionRef(Rc<Function>);

impl FunctionRef {
    pub(crate) fn new(func: NativeFn, upvalues: Vec<Value>) -> Self {
        Self(Rc::new(Function { func, upvalues }))
    }

    #[inline]
    pub fn address(&self) -> usize {
        Rc::as_ptr(&self.0) as *const () as usize
    }

    #[inline]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl core::ops::Deref for FunctionRef {
    type Target = Function;

    #[inline]
    fn deref(&self) -> &Function {
        &self.0
    }
}
