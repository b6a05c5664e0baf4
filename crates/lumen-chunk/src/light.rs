use lumen_blocks::{Face, MAX_LIGHT};

/// Which of the two independent light channels a value refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Channel {
    Sky,
    Block,
}

impl Channel {
    pub const ALL: [Channel; 2] = [Channel::Sky, Channel::Block];
}

/// Packed sky/block light of one voxel: sky in the high nibble, block in the low one.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct LightValue(u8);

impl LightValue {
    pub const NULL: LightValue = LightValue(0);
    pub const SUNLIGHT: LightValue = LightValue(MAX_LIGHT << 4);

    #[inline]
    pub fn new(sky: u8, block: u8) -> Self {
        Self((sky.min(MAX_LIGHT) << 4) | block.min(MAX_LIGHT))
    }

    #[inline]
    pub const fn from_raw(raw: u8) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn raw(self) -> u8 {
        self.0
    }

    #[inline]
    pub const fn sky(self) -> u8 {
        self.0 >> 4
    }

    #[inline]
    pub const fn block(self) -> u8 {
        self.0 & 0x0F
    }

    #[inline]
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }

    /// Component-wise maximum.
    #[inline]
    pub fn max(self, other: LightValue) -> LightValue {
        Self::new(self.sky().max(other.sky()), self.block().max(other.block()))
    }

    /// Light handed to the neighbor one step in direction `face`.
    ///
    /// Full sky light travels straight down without loss; every other step
    /// costs one level per channel.
    #[inline]
    pub fn attenuated(self, face: Face) -> LightValue {
        let sky = if face == Face::NegY && self.sky() == MAX_LIGHT {
            MAX_LIGHT
        } else {
            self.sky().saturating_sub(1)
        };
        Self::new(sky, self.block().saturating_sub(1))
    }

    #[inline]
    pub fn channel(self, ch: Channel) -> u8 {
        match ch {
            Channel::Sky => self.sky(),
            Channel::Block => self.block(),
        }
    }

    #[inline]
    pub fn with_channel(self, ch: Channel, level: u8) -> LightValue {
        match ch {
            Channel::Sky => Self::new(level, self.block()),
            Channel::Block => Self::new(self.sky(), level),
        }
    }
}

impl std::fmt::Display for LightValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sky {} block {}", self.sky(), self.block())
    }
}
