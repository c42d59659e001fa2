//! Animated test pattern: a rectangle that pulses inward and outward,
//! plus a trail of lit pixels that grows by one per frame.

use winview_core::PixelFormat;

const WHITE: u8 = 255;
/// The rectangle inset cycles through `0..PULSE` in steps of 2.
const PULSE: usize = 100;
const MARGIN: usize = 3;

/// A pixel buffer that redraws itself frame by frame.
#[derive(Debug, Clone)]
pub struct TestPattern {
    width: u16,
    height: u16,
    format: PixelFormat,
    pixels: Vec<u8>,
    trail: usize,
    inset: usize,
    frames: u64,
}

impl TestPattern {
    pub fn new(width: u16, height: u16, format: PixelFormat) -> Self {
        Self {
            width,
            height,
            format,
            pixels: vec![0; Self::buffer_len(width, height, format)],
            trail: 0,
            inset: 0,
            frames: 0,
        }
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Start over on a blank canvas of a new size.
    pub fn resize(&mut self, width: u16, height: u16) {
        *self = Self::new(width, height, self.format);
    }

    /// Draw the next frame.
    pub fn advance(&mut self) {
        let area = self.width as usize * self.height as usize;
        if area > 0 {
            let (x, y) = (self.trail % self.width as usize, self.trail / self.width as usize);
            self.put(x as isize, y as isize, WHITE);
            self.trail = (self.trail + 1) % area;
        }

        self.inset = (self.inset + 2) % PULSE;
        let near = (self.inset + MARGIN) as isize;
        let far_x = self.width as isize - near;
        let far_y = self.height as isize - near;
        self.draw_rect(near, near, far_x, far_y, WHITE);

        self.frames += 1;
    }

    fn buffer_len(width: u16, height: u16, format: PixelFormat) -> usize {
        width as usize * height as usize * format.bytes_per_pixel() as usize
    }

    /// Outline of the rectangle spanned by two corners, clipped to the canvas.
    fn draw_rect(&mut self, x0: isize, y0: isize, x1: isize, y1: isize, shade: u8) {
        let (left, right) = (x0.min(x1), x0.max(x1));
        let (top, bottom) = (y0.min(y1), y0.max(y1));
        for x in left..=right {
            self.put(x, top, shade);
            self.put(x, bottom, shade);
        }
        for y in top..=bottom {
            self.put(left, y, shade);
            self.put(right, y, shade);
        }
    }

    fn put(&mut self, x: isize, y: isize, shade: u8) {
        if x < 0 || y < 0 || x >= self.width as isize || y >= self.height as isize {
            return;
        }
        let bpp = self.format.bytes_per_pixel() as usize;
        let at = (x as usize + y as usize * self.width as usize) * bpp;
        match self.format {
            PixelFormat::Grayscale8 => self.pixels[at] = shade,
            PixelFormat::Argb32 => {
                self.pixels[at..at + 4].copy_from_slice(&[0xFF, shade, shade, shade])
            }
        }
    }
}
