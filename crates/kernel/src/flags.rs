use ipvsd_core::Flag;

/// Packs a flag set into the kernel's `IP_VS_SVC_F_*` bitfield.
pub fn to_bits(flags: &[Flag]) -> u32 {
    flags.iter().fold(0, |mask, f| mask | f.bit())
}

/// Unpacks the kernel's bitfield back into the flag set, applying the
/// all-ones write mask so bits outside the named vocabulary never survive
/// a write/read round trip.
pub fn from_bits(bits: u32) -> Vec<Flag> {
    Flag::from_bits(bits & Flag::all_bits())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_flag_set() {
        let flags = vec![Flag::Flag2, Flag::ShPort];
        let bits = to_bits(&flags);
        let mut back = from_bits(bits);
        back.sort_by_key(|f| f.bit());
        let mut expected = flags;
        expected.sort_by_key(|f| f.bit());
        assert_eq!(back, expected);
    }

    #[test]
    fn masks_out_bits_outside_the_named_vocabulary() {
        let bits = Flag::all_bits() | (1 << 30);
        assert_eq!(from_bits(bits).len(), 5);
    }
}
