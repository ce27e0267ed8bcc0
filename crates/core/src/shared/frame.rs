use ndarray::{ArrayView3, ArrayViewMut3};

/// Bytes per pixel for decoded frames. Frames are always packed RGB24.
pub const RGB_CHANNELS: usize = 3;

/// One decoded video frame: tightly packed RGB24 in row-major order.
///
/// The ffmpeg adapters convert to and from this layout at the edges so the
/// compositor only ever sees plain pixel buffers.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    index: usize,
}

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, index: usize) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * RGB_CHANNELS,
            "data length must equal width * height * 3"
        );
        Self {
            data,
            width,
            height,
            index,
        }
    }

    /// A frame filled with a single grey level.
    pub fn filled(width: u32, height: u32, index: usize, value: u8) -> Self {
        Self::new(
            vec![value; (width as usize) * (height as usize) * RGB_CHANNELS],
            width,
            height,
            index,
        )
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Position of the frame in decode order, starting at 0.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Presentation time in seconds, assuming a constant frame rate.
    pub fn time_at(&self, fps: f64) -> f64 {
        if fps <= 0.0 {
            return 0.0;
        }
        self.index as f64 / fps
    }

    pub fn as_ndarray(&self) -> ArrayView3<'_, u8> {
        ArrayView3::from_shape(self.shape(), &self.data)
            .expect("Frame data length must match dimensions")
    }

    pub fn as_ndarray_mut(&mut self) -> ArrayViewMut3<'_, u8> {
        let shape = self.shape();
        ArrayViewMut3::from_shape(shape, &mut self.data)
            .expect("Frame data length must match dimensions")
    }

    fn shape(&self) -> (usize, usize, usize) {
        (self.height as usize, self.width as usize, RGB_CHANNELS)
    }
}
