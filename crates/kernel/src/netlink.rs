use std::net::IpAddr;

use async_trait::async_trait;
use futures::StreamExt;
use genetlink::{new_connection, GenetlinkHandle};
use ipvsd_core::{Backend, BackendKey, Forward, Protocol, Service, ServiceKey};
use netlink_packet_core::{
    DefaultNla, Nla, NetlinkHeader, NetlinkMessage, NetlinkPayload, NlasIterator, NLM_F_ACK,
    NLM_F_DUMP, NLM_F_REQUEST,
};
use netlink_packet_generic::ctrl::{nlas::GenlCtrlAttrs, GenlCtrl, GenlCtrlCmd};
use netlink_packet_generic::GenlMessage;
use tokio::sync::Mutex;

use crate::error::KernelError;
use crate::flags;
use crate::forward;
use crate::Kernel;

/// Name under which the `ip_vs` kernel module registers its generic
/// netlink family.
const IPVS_GENL_NAME: &str = "IPVS";

// `IPVS_CMD_*` from `linux/ip_vs.h`.
const IPVS_CMD_NEW_SERVICE: u8 = 1;
const IPVS_CMD_SET_SERVICE: u8 = 2;
const IPVS_CMD_DEL_SERVICE: u8 = 3;
const IPVS_CMD_GET_SERVICE: u8 = 4;
const IPVS_CMD_NEW_DEST: u8 = 5;
const IPVS_CMD_SET_DEST: u8 = 6;
const IPVS_CMD_DEL_DEST: u8 = 7;
const IPVS_CMD_GET_DEST: u8 = 8;
const IPVS_CMD_FLUSH: u8 = 16;

// `IPVS_SVC_ATTR_*` / `IPVS_DEST_ATTR_*` top-level attribute types, nested
// inside `IPVS_CMD_ATTR_SERVICE` / `IPVS_CMD_ATTR_DEST`.
const IPVS_CMD_ATTR_SERVICE: u16 = 1;
const IPVS_CMD_ATTR_DEST: u16 = 2;

const IPVS_SVC_ATTR_AF: u16 = 1;
const IPVS_SVC_ATTR_PROTOCOL: u16 = 2;
const IPVS_SVC_ATTR_ADDR: u16 = 3;
const IPVS_SVC_ATTR_PORT: u16 = 4;
const IPVS_SVC_ATTR_SCHED_NAME: u16 = 6;
const IPVS_SVC_ATTR_FLAGS: u16 = 7;

const IPVS_DEST_ATTR_ADDR: u16 = 1;
const IPVS_DEST_ATTR_PORT: u16 = 2;
const IPVS_DEST_ATTR_FWD_METHOD: u16 = 3;
const IPVS_DEST_ATTR_WEIGHT: u16 = 4;

/// Kernel table adapter backed by the real `IPVS` generic-netlink family.
/// Encodes/decodes the minimal attribute set the daemon relies on; fields
/// the kernel module accepts but the daemon never sets (persistence
/// timeout, netmask, stats) are left at their kernel-side defaults.
pub struct NetlinkKernel {
    handle: Mutex<GenetlinkHandle>,
    family_id: u16,
}

impl NetlinkKernel {
    pub async fn connect() -> Result<Self, KernelError> {
        let (conn, handle, _) =
            new_connection().map_err(|e| KernelError::Transport(e.to_string()))?;
        tokio::spawn(conn);
        let family_id = resolve_family(&handle).await?;
        Ok(NetlinkKernel {
            handle: Mutex::new(handle),
            family_id,
        })
    }

    async fn request(&self, cmd: u8, nlas: Vec<DefaultNla>) -> Result<Vec<Vec<u8>>, KernelError> {
        let mut message = NetlinkMessage::from(GenlMessage::from_payload(IpvsPayload {
            cmd,
            nlas,
        }));
        message.header.flags = NLM_F_REQUEST | NLM_F_ACK;
        message.finalize();

        let mut handle = self.handle.lock().await;
        let mut responses = handle
            .request(message)
            .await
            .map_err(|e| KernelError::Transport(e.to_string()))?;

        let mut payloads = Vec::new();
        while let Some(msg) = responses.next().await {
            match msg.payload {
                NetlinkPayload::InnerMessage(generic) => payloads.push(generic.payload.into()),
                NetlinkPayload::Error(e) => {
                    return Err(KernelError::Rejected(e.to_string()));
                }
                _ => {}
            }
        }
        Ok(payloads)
    }
}

async fn resolve_family(handle: &GenetlinkHandle) -> Result<u16, KernelError> {
    let mut message = NetlinkMessage::from(GenlMessage::from_payload(GenlCtrl {
        cmd: GenlCtrlCmd::GetFamily,
        nlas: vec![GenlCtrlAttrs::FamilyName(IPVS_GENL_NAME.to_owned())],
    }));
    message.header.flags = NLM_F_REQUEST | NLM_F_ACK;
    message.finalize();

    let mut handle = handle.clone();
    let mut responses = handle
        .request(message)
        .await
        .map_err(|_| KernelError::FamilyNotFound)?;

    while let Some(msg) = responses.next().await {
        if let NetlinkPayload::InnerMessage(generic) = msg.payload {
            for nla in &generic.payload.nlas {
                if let GenlCtrlAttrs::FamilyId(id) = nla {
                    return Ok(*id);
                }
            }
        }
    }
    Err(KernelError::FamilyNotFound)
}

/// Thin `GenlFamily` payload carrying the IPVS command byte and its nested
/// attributes; the IPVS family has no dedicated message version beyond 0.
#[derive(Debug)]
struct IpvsPayload {
    cmd: u8,
    nlas: Vec<DefaultNla>,
}

impl netlink_packet_generic::GenlFamily for IpvsPayload {
    fn family_name() -> &'static str {
        "IPVS"
    }

    fn command(&self) -> u8 {
        self.cmd
    }

    fn version(&self) -> u8 {
        0
    }
}

impl Nla for IpvsPayload {
    fn value_len(&self) -> usize {
        self.nlas.iter().map(|nla| nla.buffer_len()).sum()
    }

    fn kind(&self) -> u16 {
        0
    }

    fn emit_value(&self, buffer: &mut [u8]) {
        let mut offset = 0;
        for nla in &self.nlas {
            nla.emit(&mut buffer[offset..offset + nla.buffer_len()]);
            offset += nla.buffer_len();
        }
    }
}

fn addr_nla(kind: u16, ip: IpAddr) -> DefaultNla {
    match ip {
        IpAddr::V4(v4) => DefaultNla::new(kind, v4.octets().to_vec()),
        IpAddr::V6(v6) => DefaultNla::new(kind, v6.octets().to_vec()),
    }
}

fn port_nla(kind: u16, port: u16) -> DefaultNla {
    DefaultNla::new(kind, port.to_be_bytes().to_vec())
}

fn u32_nla(kind: u16, value: u32) -> DefaultNla {
    DefaultNla::new(kind, value.to_ne_bytes().to_vec())
}

fn service_nlas(svc: &Service) -> Vec<DefaultNla> {
    let af = match svc.key.vip {
        IpAddr::V4(_) => 2,  // AF_INET
        IpAddr::V6(_) => 10, // AF_INET6
    };
    let service = NestedNla::new(
        IPVS_CMD_ATTR_SERVICE,
        vec![
            u32_nla(IPVS_SVC_ATTR_AF, af),
            u32_nla(IPVS_SVC_ATTR_PROTOCOL, svc.key.protocol.number() as u32),
            addr_nla(IPVS_SVC_ATTR_ADDR, svc.key.vip),
            port_nla(IPVS_SVC_ATTR_PORT, svc.key.port),
            DefaultNla::new(
                IPVS_SVC_ATTR_SCHED_NAME,
                svc.scheduler.as_bytes().to_vec(),
            ),
            u32_nla(IPVS_SVC_ATTR_FLAGS, flags::to_bits(&svc.flags)),
        ],
    );
    vec![service.into_default()]
}

fn backend_nlas(backend: &Backend) -> Vec<DefaultNla> {
    let dest = NestedNla::new(
        IPVS_CMD_ATTR_DEST,
        vec![
            addr_nla(IPVS_DEST_ATTR_ADDR, backend.key.ip),
            port_nla(IPVS_DEST_ATTR_PORT, backend.key.port),
            u32_nla(IPVS_DEST_ATTR_FWD_METHOD, forward::to_kernel(backend.forward)),
            u32_nla(IPVS_DEST_ATTR_WEIGHT, backend.weight),
        ],
    );
    vec![dest.into_default()]
}

/// Helper to pack a set of child NLAs behind one nested attribute header,
/// matching how `ip_vs.h` groups service/dest fields under one container.
struct NestedNla {
    kind: u16,
    children: Vec<DefaultNla>,
}

impl NestedNla {
    fn new(kind: u16, children: Vec<DefaultNla>) -> Self {
        NestedNla { kind, children }
    }

    fn into_default(self) -> DefaultNla {
        let mut buf = vec![0u8; self.children.iter().map(|c| c.buffer_len()).sum()];
        let mut offset = 0;
        for child in &self.children {
            child.emit(&mut buf[offset..offset + child.buffer_len()]);
            offset += child.buffer_len();
        }
        DefaultNla::new(self.kind, buf)
    }
}

fn parse_service_attrs(buf: &[u8]) -> Option<Service> {
    let mut vip = None;
    let mut port = None;
    let mut protocol = None;
    let mut scheduler = String::new();
    let mut bits = 0u32;

    for nla in NlasIterator::new(buf) {
        let nla = nla.ok()?;
        match nla.kind() {
            IPVS_SVC_ATTR_ADDR => {
                vip = parse_addr(nla.value());
            }
            IPVS_SVC_ATTR_PORT => {
                port = nla.value().get(0..2).map(|b| u16::from_be_bytes([b[0], b[1]]));
            }
            IPVS_SVC_ATTR_PROTOCOL => {
                let n = *nla.value().first()?;
                protocol = if n == Protocol::Tcp.number() {
                    Some(Protocol::Tcp)
                } else if n == Protocol::Udp.number() {
                    Some(Protocol::Udp)
                } else {
                    None
                };
            }
            IPVS_SVC_ATTR_SCHED_NAME => {
                scheduler = String::from_utf8_lossy(nla.value())
                    .trim_end_matches('\0')
                    .to_owned();
            }
            IPVS_SVC_ATTR_FLAGS => {
                if nla.value().len() >= 4 {
                    bits = u32::from_ne_bytes(nla.value()[0..4].try_into().ok()?);
                }
            }
            _ => {}
        }
    }

    Some(Service {
        key: ServiceKey {
            vip: vip?,
            port: port?,
            protocol: protocol?,
        },
        scheduler,
        flags: flags::from_bits(bits),
        store_id: String::new(),
    })
}

fn parse_backend_attrs(buf: &[u8]) -> Option<Backend> {
    let mut ip = None;
    let mut port = None;
    let mut weight = 0u32;
    let mut fwd = Forward::Nat;

    for nla in NlasIterator::new(buf) {
        let nla = nla.ok()?;
        match nla.kind() {
            IPVS_DEST_ATTR_ADDR => ip = parse_addr(nla.value()),
            IPVS_DEST_ATTR_PORT => {
                port = nla.value().get(0..2).map(|b| u16::from_be_bytes([b[0], b[1]]));
            }
            IPVS_DEST_ATTR_WEIGHT => {
                if nla.value().len() >= 4 {
                    weight = u32::from_ne_bytes(nla.value()[0..4].try_into().ok()?);
                }
            }
            IPVS_DEST_ATTR_FWD_METHOD => {
                if nla.value().len() >= 4 {
                    let bits = u32::from_ne_bytes(nla.value()[0..4].try_into().ok()?);
                    fwd = forward::from_kernel(bits).unwrap_or(Forward::Nat);
                }
            }
            _ => {}
        }
    }

    Some(Backend {
        key: BackendKey {
            ip: ip?,
            port: port?,
        },
        weight,
        forward: fwd,
        store_id: String::new(),
        pulse: ipvsd_core::PulseOptions::default(),
    })
}

fn parse_addr(buf: &[u8]) -> Option<IpAddr> {
    match buf.len() {
        4 => Some(IpAddr::from([buf[0], buf[1], buf[2], buf[3]])),
        16 => {
            let octets: [u8; 16] = buf.try_into().ok()?;
            Some(IpAddr::from(octets))
        }
        _ => None,
    }
}

#[async_trait]
impl Kernel for NetlinkKernel {
    async fn init(&self) -> Result<(), KernelError> {
        Ok(())
    }

    async fn flush(&self) -> Result<(), KernelError> {
        self.request(IPVS_CMD_FLUSH, Vec::new()).await?;
        Ok(())
    }

    async fn add_service(&self, svc: &Service) -> Result<(), KernelError> {
        self.request(IPVS_CMD_NEW_SERVICE, service_nlas(svc))
            .await?;
        Ok(())
    }

    async fn update_service(&self, svc: &Service) -> Result<(), KernelError> {
        self.request(IPVS_CMD_SET_SERVICE, service_nlas(svc))
            .await?;
        Ok(())
    }

    async fn delete_service(&self, key: &ServiceKey) -> Result<(), KernelError> {
        let placeholder = Service {
            key: *key,
            scheduler: String::new(),
            flags: Vec::new(),
            store_id: String::new(),
        };
        self.request(IPVS_CMD_DEL_SERVICE, service_nlas(&placeholder))
            .await?;
        Ok(())
    }

    async fn list_services(&self) -> Result<Vec<Service>, KernelError> {
        let mut message = NetlinkMessage::from(GenlMessage::from_payload(IpvsPayload {
            cmd: IPVS_CMD_GET_SERVICE,
            nlas: Vec::new(),
        }));
        message.header = NetlinkHeader::default();
        message.header.flags = NLM_F_REQUEST | NLM_F_DUMP;
        message.finalize();

        let mut handle = self.handle.lock().await;
        let mut responses = handle
            .request(message)
            .await
            .map_err(|e| KernelError::Transport(e.to_string()))?;

        let mut services = Vec::new();
        while let Some(msg) = responses.next().await {
            let Ok(msg) = msg else {
                continue;
            };
            if let NetlinkPayload::InnerMessage(generic) = msg.payload {
                if let Some(svc) = parse_service_attrs(&Vec::from(generic.payload)) {
                    services.push(svc);
                }
            }
        }
        Ok(services)
    }

    async fn add_backend(&self, _svc: &ServiceKey, backend: &Backend) -> Result<(), KernelError> {
        self.request(IPVS_CMD_NEW_DEST, backend_nlas(backend))
            .await?;
        Ok(())
    }

    async fn update_backend(
        &self,
        _svc: &ServiceKey,
        backend: &Backend,
    ) -> Result<(), KernelError> {
        self.request(IPVS_CMD_SET_DEST, backend_nlas(backend))
            .await?;
        Ok(())
    }

    async fn delete_backend(
        &self,
        _svc: &ServiceKey,
        key: &BackendKey,
    ) -> Result<(), KernelError> {
        let placeholder = Backend {
            key: *key,
            weight: 0,
            forward: Forward::Nat,
            store_id: String::new(),
            pulse: ipvsd_core::PulseOptions::default(),
        };
        self.request(IPVS_CMD_DEL_DEST, backend_nlas(&placeholder))
            .await?;
        Ok(())
    }

    async fn list_backends(&self, svc: &ServiceKey) -> Result<Vec<Backend>, KernelError> {
        let placeholder = Service {
            key: *svc,
            scheduler: String::new(),
            flags: Vec::new(),
            store_id: String::new(),
        };
        let mut message = NetlinkMessage::from(GenlMessage::from_payload(IpvsPayload {
            cmd: IPVS_CMD_GET_DEST,
            nlas: service_nlas(&placeholder),
        }));
        message.header.flags = NLM_F_REQUEST | NLM_F_DUMP;
        message.finalize();

        let mut handle = self.handle.lock().await;
        let mut responses = handle
            .request(message)
            .await
            .map_err(|e| KernelError::Transport(e.to_string()))?;

        let mut backends = Vec::new();
        while let Some(msg) = responses.next().await {
            let Ok(msg) = msg else {
                continue;
            };
            if let NetlinkPayload::InnerMessage(generic) = msg.payload {
                if let Some(b) = parse_backend_attrs(&Vec::from(generic.payload)) {
                    backends.push(b);
                }
            }
        }
        Ok(backends)
    }
}
