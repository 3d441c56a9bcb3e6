//! Utility to add a source line to any type

use std::{
    fmt::{Debug, Display},
    ops::{Deref, DerefMut},
};

use serde::Serialize;

/// Wrapper type that adds the 1-based source line to another
#[derive(PartialEq, Serialize)]
pub struct Located<T> {
    inner: T,
    line: usize,
}

impl<T> Located<T> {
    /// Create a new instance of [`Located`]
    pub fn new(inner: T, line: usize) -> Self {
        Self { inner, line }
    }

    /// Map the inner value while keeping the same location
    pub fn map<F, O>(self, f: F) -> Located<O>
    where
        F: FnOnce(T) -> O,
    {
        Located {
            inner: f(self.inner),
            line: self.line,
        }
    }

    /// Discard the location and consume the inner value
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Consume and get the inner value and its line
    pub fn take_pair(self) -> (T, usize) {
        (self.inner, self.line)
    }

    /// Get the line
    pub fn line(&self) -> usize {
        self.line
    }
}

impl<T> Clone for Located<T>
where
    T: Clone,
{
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            line: self.line,
        }
    }
}

impl<T> Debug for Located<T>
where
    T: Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.inner.fmt(f)?;
        write!(f, " @ line {}", self.line)
    }
}

impl<T> Display for Located<T>
where
    T: Display,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.inner.fmt(f)
    }
}

impl<T> Deref for Located<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl<T> DerefMut for Located<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.inner
    }
}
