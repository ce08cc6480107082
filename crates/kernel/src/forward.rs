use ipvsd_core::Forward;

/// `IP_VS_CONN_F_*` forwarding-method bits, as used by the kernel's
/// `ip_vs_service_user`/`ip_vs_dest_user` netlink attributes.
const IP_VS_CONN_F_MASQ: u32 = 0x0000;
const IP_VS_CONN_F_TUNNEL: u32 = 0x0002;
const IP_VS_CONN_F_DROUTE: u32 = 0x0003;

pub fn to_kernel(fwd: Forward) -> u32 {
    match fwd {
        Forward::Nat => IP_VS_CONN_F_MASQ,
        Forward::Tunnel => IP_VS_CONN_F_TUNNEL,
        Forward::Dr => IP_VS_CONN_F_DROUTE,
    }
}

pub fn from_kernel(bits: u32) -> Option<Forward> {
    match bits {
        IP_VS_CONN_F_MASQ => Some(Forward::Nat),
        IP_VS_CONN_F_TUNNEL => Some(Forward::Tunnel),
        IP_VS_CONN_F_DROUTE => Some(Forward::Dr),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_every_forwarding_method() {
        for fwd in [Forward::Nat, Forward::Dr, Forward::Tunnel] {
            assert_eq!(from_kernel(to_kernel(fwd)), Some(fwd));
        }
    }
}
