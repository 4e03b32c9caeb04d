//! A pipeline used as the data source of another pipeline

use std::fmt;
use std::rc::Rc;

use super::LazyCollection;
use crate::error::Result;
use crate::source::{Cursor, DataSource};

/// Source that streams an upstream pipeline's output through a conversion
///
/// Each cursor re-runs the upstream pipeline. Blocks after the last upstream
/// sort are evaluated lazily, one pulled element at a time.
pub struct PipelineSource<T, U> {
    upstream: LazyCollection<T>,
    convert: Rc<dyn Fn(T) -> Result<U>>,
}

impl<T: 'static, U> PipelineSource<T, U> {
    pub fn new<F>(upstream: LazyCollection<T>, convert: F) -> Self
    where
        F: Fn(T) -> Result<U> + 'static,
    {
        PipelineSource {
            upstream,
            convert: Rc::new(convert),
        }
    }
}

impl<T: 'static, U> DataSource<U> for PipelineSource<T, U> {
    fn cursor(&self) -> Result<Cursor<'_, U>> {
        let stream = self.upstream.stream()?;
        let convert = Rc::clone(&self.convert);
        Ok(Box::new(stream.map(move |item| item.and_then(|x| convert(x)))))
    }

    /// Known only when the upstream queue is empty (its output is its source).
    fn known_len(&self) -> Option<usize> {
        if self.upstream.queue_len() > 0 {
            return None;
        }
        let len = self.upstream.source_len()?;
        Some(self.upstream.limit().map_or(len, |limit| len.min(limit)))
    }
}

impl<T, U> fmt::Debug for PipelineSource<T, U> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineSource")
            .field("upstream", &self.upstream)
            .finish()
    }
}
