//! TEX1 texture entries: GX image format/raw data plus the sampler state
//! (wrap modes, filters, LOD) every material's samplers reference by index.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    I4,
    I8,
    IA4,
    IA8,
    RGB565,
    RGB5A3,
    RGBA32,
    C4,
    C8,
    C14X2,
    CMPR,
}

impl ImageFormat {
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(Self::I4),
            1 => Some(Self::I8),
            2 => Some(Self::IA4),
            3 => Some(Self::IA8),
            4 => Some(Self::RGB565),
            5 => Some(Self::RGB5A3),
            6 => Some(Self::RGBA32),
            8 => Some(Self::C4),
            9 => Some(Self::C8),
            10 => Some(Self::C14X2),
            14 => Some(Self::CMPR),
            _ => None,
        }
    }

    pub fn as_u8(self) -> u8 {
        match self {
            Self::I4 => 0,
            Self::I8 => 1,
            Self::IA4 => 2,
            Self::IA8 => 3,
            Self::RGB565 => 4,
            Self::RGB5A3 => 5,
            Self::RGBA32 => 6,
            Self::C4 => 8,
            Self::C8 => 9,
            Self::C14X2 => 10,
            Self::CMPR => 14,
        }
    }

    /// Block dimensions (width, height) for this format's tiling scheme.
    pub fn block_size(self) -> (u32, u32) {
        match self {
            Self::I4 | Self::C4 => (8, 8),
            Self::I8 | Self::IA4 | Self::C8 => (8, 4),
            Self::IA8 | Self::RGB565 | Self::RGB5A3 | Self::C14X2 => (4, 4),
            Self::RGBA32 => (4, 4),
            Self::CMPR => (8, 8),
        }
    }

    /// Bits per pixel, used to size a tile's byte count together with
    /// [`Self::block_size`].
    pub fn bits_per_pixel(self) -> u32 {
        match self {
            Self::I4 | Self::C4 => 4,
            Self::I8 | Self::IA4 | Self::C8 => 8,
            Self::IA8 | Self::RGB565 | Self::RGB5A3 | Self::C14X2 => 16,
            Self::RGBA32 => 32,
            Self::CMPR => 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WrapMode {
    Clamp,
    Repeat,
    Mirror,
}

impl WrapMode {
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(Self::Clamp),
            1 => Some(Self::Repeat),
            2 => Some(Self::Mirror),
            _ => None,
        }
    }

    pub fn as_u8(self) -> u8 {
        match self {
            Self::Clamp => 0,
            Self::Repeat => 1,
            Self::Mirror => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterMode {
    Nearest,
    Linear,
    NearestMipNearest,
    LinearMipNearest,
    NearestMipLinear,
    LinearMipLinear,
}

impl FilterMode {
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(Self::Nearest),
            1 => Some(Self::Linear),
            2 => Some(Self::NearestMipNearest),
            3 => Some(Self::LinearMipNearest),
            4 => Some(Self::NearestMipLinear),
            5 => Some(Self::LinearMipLinear),
            _ => None,
        }
    }

    pub fn as_u8(self) -> u8 {
        match self {
            Self::Nearest => 0,
            Self::Linear => 1,
            Self::NearestMipNearest => 2,
            Self::LinearMipNearest => 3,
            Self::NearestMipLinear => 4,
            Self::LinearMipLinear => 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Texture {
    pub name: String,
    pub format: ImageFormat,
    pub width: u16,
    pub height: u16,
    pub wrap_s: WrapMode,
    pub wrap_t: WrapMode,
    pub palette: Vec<u8>,
    pub min_filter: FilterMode,
    pub mag_filter: FilterMode,
    pub min_lod: f32,
    pub max_lod: f32,
    pub lod_bias: f32,
    pub mipmap_count: u8,
    pub data: Vec<u8>,
}

impl Texture {
    /// Number of 32x32-tile blocks this image occupies at full resolution,
    /// rounding each dimension up to the format's native block size.
    pub fn block_count(&self) -> u32 {
        let (bw, bh) = self.format.block_size();
        let blocks_x = (self.width as u32).div_ceil(bw);
        let blocks_y = (self.height as u32).div_ceil(bh);
        blocks_x * blocks_y
    }

    /// Byte size of the base mip level's raw data.
    pub fn base_level_size(&self) -> u32 {
        let (bw, bh) = self.format.block_size();
        let bytes_per_block = bw * bh * self.format.bits_per_pixel() / 8;
        self.block_count() * bytes_per_block
    }
}
