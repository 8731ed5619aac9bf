//! Reversible mapping between item indices and the geographic-shaped
//! locations the routing collaborator works with.
//!
//! An index `i` becomes `lat = i / base`, `lng = i % base`. Both fields are
//! whole numbers, so the pair survives a trip through a solver that treats it
//! as an opaque coordinate and only ever compares or echoes it back.

use crate::{Error, ItemIndex, Result, routing::Location};

pub const DEFAULT_CODEC_BASE: u32 = 1_000;
const MIN_CODEC_BASE: u32 = 2;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct LocationCodec {
    base: u32,
}

impl Default for LocationCodec {
    fn default() -> Self {
        Self {
            base: DEFAULT_CODEC_BASE,
        }
    }
}

impl LocationCodec {
    pub fn new(base: u32) -> Result<Self> {
        if base < MIN_CODEC_BASE {
            return Err(Error::invalid_input(format!(
                "codec base must be >= {MIN_CODEC_BASE}, got {base}"
            )));
        }
        Ok(Self { base })
    }

    /// Builds a codec able to represent `item_count` indices, starting from
    /// `base` and widening it instead of letting indices alias.
    pub fn for_item_count(base: u32, item_count: usize) -> Result<Self> {
        let codec = Self::new(base)?;
        if (item_count as u64) <= codec.capacity() {
            return Ok(codec);
        }

        let mut widened = (item_count as f64).sqrt().ceil() as u64;
        while widened * widened < item_count as u64 {
            widened += 1;
        }
        let widened = u32::try_from(widened).map_err(|_| {
            Error::invalid_input(format!("{item_count} items exceed the codec range"))
        })?;

        log::info!("codec: widened base from={base} to={widened} n={item_count}");
        Self::new(widened)
    }

    pub fn base(&self) -> u32 {
        self.base
    }

    /// Number of distinct indices this codec can represent.
    pub fn capacity(&self) -> u64 {
        u64::from(self.base) * u64::from(self.base)
    }

    pub fn encode(&self, index: ItemIndex) -> Result<Location> {
        if index as u64 >= self.capacity() {
            return Err(Error::invalid_input(format!(
                "index {index} is outside the codec range (capacity {})",
                self.capacity()
            )));
        }
        let base = self.base as usize;
        Ok(Location::new((index / base) as f64, (index % base) as f64))
    }

    pub fn decode(&self, location: &Location) -> Result<ItemIndex> {
        let major = self.component(location.lat, "lat", location)?;
        let minor = self.component(location.lng, "lng", location)?;
        Ok((major * u64::from(self.base) + minor) as ItemIndex)
    }

    fn component(&self, value: f64, name: &str, location: &Location) -> Result<u64> {
        if !value.is_finite() || value < 0.0 || value.fract() != 0.0 {
            return Err(Error::invalid_data(format!(
                "location {location} has a non-index {name} component"
            )));
        }
        if value >= f64::from(self.base) {
            return Err(Error::invalid_data(format!(
                "location {location} has {name} >= codec base {}",
                self.base
            )));
        }
        Ok(value as u64)
    }
}
