//! Typed, borrowed views over caller-provided datasets.
//!
//! The engine accepts six element widths without copying the caller's buffer.
//! A [`DatasetView`] fixes the shape interpretation up front: with
//! `rowwise = true` each of the `rows` rows is one `cols`-dimensional point,
//! otherwise every scalar cell is its own one-dimensional point.

use crate::error::DatasetError;

/// Element width of the scalars in a dataset buffer.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[non_exhaustive]
pub enum ElementKind {
    /// Signed 8-bit integers.
    I8,
    /// Signed 16-bit integers.
    I16,
    /// Signed 32-bit integers.
    I32,
    /// Signed 64-bit integers.
    I64,
    /// 32-bit floating point.
    F32,
    /// 64-bit floating point.
    F64,
}

/// Borrowed, typed dataset storage.
#[derive(Clone, Copy, Debug)]
#[non_exhaustive]
pub enum ElementBuffer<'a> {
    /// Signed 8-bit integers.
    I8(&'a [i8]),
    /// Signed 16-bit integers.
    I16(&'a [i16]),
    /// Signed 32-bit integers.
    I32(&'a [i32]),
    /// Signed 64-bit integers.
    I64(&'a [i64]),
    /// 32-bit floating point.
    F32(&'a [f32]),
    /// 64-bit floating point.
    F64(&'a [f64]),
}

impl ElementBuffer<'_> {
    /// Returns the number of scalars in the buffer.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::I8(s) => s.len(),
            Self::I16(s) => s.len(),
            Self::I32(s) => s.len(),
            Self::I64(s) => s.len(),
            Self::F32(s) => s.len(),
            Self::F64(s) => s.len(),
        }
    }

    /// Returns whether the buffer holds no scalars.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the element width of the buffer.
    #[must_use]
    pub const fn kind(&self) -> ElementKind {
        match self {
            Self::I8(_) => ElementKind::I8,
            Self::I16(_) => ElementKind::I16,
            Self::I32(_) => ElementKind::I32,
            Self::I64(_) => ElementKind::I64,
            Self::F32(_) => ElementKind::F32,
            Self::F64(_) => ElementKind::F64,
        }
    }

    fn value(&self, idx: usize) -> f64 {
        match self {
            Self::I8(s) => f64::from(s[idx]),
            Self::I16(s) => f64::from(s[idx]),
            Self::I32(s) => f64::from(s[idx]),
            Self::I64(s) => s[idx] as f64,
            Self::F32(s) => f64::from(s[idx]),
            Self::F64(s) => s[idx],
        }
    }
}

/// Borrowed view of an `rows x cols` dataset.
///
/// # Examples
/// ```
/// use engawa_core::{DatasetView, ElementBuffer};
///
/// let values = [0.0_f64, 0.0, 3.0, 4.0];
/// let view = DatasetView::new(ElementBuffer::F64(&values), 2, 2, true)?;
/// assert_eq!(view.num_points(), 2);
/// assert_eq!(view.dimensions(), 2);
/// # Ok::<(), engawa_core::DatasetError>(())
/// ```
#[derive(Clone, Copy, Debug)]
pub struct DatasetView<'a> {
    buffer: ElementBuffer<'a>,
    rows: usize,
    cols: usize,
    rowwise: bool,
}

impl<'a> DatasetView<'a> {
    /// Validates the buffer against the declared shape and builds a view.
    ///
    /// # Errors
    /// Returns [`DatasetError::EmptyData`] when `rows == 0`,
    /// [`DatasetError::ZeroDimension`] when `cols == 0`, and
    /// [`DatasetError::LengthMismatch`] when the buffer does not hold
    /// exactly `rows * cols` scalars.
    pub fn new(
        buffer: ElementBuffer<'a>,
        rows: usize,
        cols: usize,
        rowwise: bool,
    ) -> Result<Self, DatasetError> {
        if rows == 0 {
            return Err(DatasetError::EmptyData);
        }
        if cols == 0 {
            return Err(DatasetError::ZeroDimension);
        }
        let expected = rows * cols;
        if buffer.len() != expected {
            return Err(DatasetError::LengthMismatch {
                expected,
                got: buffer.len(),
            });
        }
        Ok(Self {
            buffer,
            rows,
            cols,
            rowwise,
        })
    }

    /// Number of points: every row when row-wise, every scalar cell otherwise.
    #[must_use]
    pub const fn num_points(&self) -> usize {
        if self.rowwise {
            self.rows
        } else {
            self.rows * self.cols
        }
    }

    /// Dimensionality of a single point.
    #[must_use]
    pub const fn dimensions(&self) -> usize {
        if self.rowwise { self.cols } else { 1 }
    }

    /// Returns the element width of the backing buffer.
    #[must_use]
    pub const fn kind(&self) -> ElementKind {
        self.buffer.kind()
    }

    /// Returns the declared row count.
    #[must_use]
    pub const fn rows(&self) -> usize {
        self.rows
    }

    /// Returns the declared column count.
    #[must_use]
    pub const fn cols(&self) -> usize {
        self.cols
    }

    /// Returns whether the dataset is interpreted row-wise.
    #[must_use]
    pub const fn rowwise(&self) -> bool {
        self.rowwise
    }

    pub(crate) fn coordinate(&self, point: usize, axis: usize) -> f64 {
        if self.rowwise {
            self.buffer.value(point * self.cols + axis)
        } else {
            self.buffer.value(point)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn rowwise_views_expose_rows_as_points() {
        let values = [1.0_f64, 2.0, 3.0, 4.0, 5.0, 6.0];
        let view = DatasetView::new(ElementBuffer::F64(&values), 2, 3, true).expect("valid view");
        assert_eq!(view.num_points(), 2);
        assert_eq!(view.dimensions(), 3);
        assert_eq!(view.coordinate(1, 2), 6.0);
        assert_eq!(view.kind(), ElementKind::F64);
    }

    #[test]
    fn cellwise_views_expose_scalars_as_points() {
        let values = [1_i32, 2, 3, 4, 5, 6];
        let view = DatasetView::new(ElementBuffer::I32(&values), 2, 3, false).expect("valid view");
        assert_eq!(view.num_points(), 6);
        assert_eq!(view.dimensions(), 1);
        assert_eq!(view.coordinate(4, 0), 5.0);
    }

    #[rstest]
    #[case(0, 3, DatasetError::EmptyData)]
    #[case(2, 0, DatasetError::ZeroDimension)]
    #[case(4, 3, DatasetError::LengthMismatch { expected: 12, got: 6 })]
    fn rejects_malformed_shapes(
        #[case] rows: usize,
        #[case] cols: usize,
        #[case] expected: DatasetError,
    ) {
        let values = [0_i16; 6];
        let err = DatasetView::new(ElementBuffer::I16(&values), rows, cols, true)
            .expect_err("shape must be rejected");
        assert_eq!(err, expected);
    }

    #[test]
    fn integer_buffers_convert_to_f64() {
        let values = [-3_i8, 7];
        let view = DatasetView::new(ElementBuffer::I8(&values), 2, 1, true).expect("valid view");
        assert_eq!(view.coordinate(0, 0), -3.0);
        assert_eq!(view.coordinate(1, 0), 7.0);
    }
}
