use std::fmt;

#[derive(Copy, Clone, Eq, PartialEq, Hash)]
pub struct FourCC(pub [u8; 4]);

impl FourCC {
    pub fn as_str_lossy(&self) -> String {
        self.0
            .iter()
            .map(|&c| if (32..=126).contains(&c) { c as char } else { '.' })
            .collect()
    }
}

impl fmt::Debug for FourCC {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str_lossy())
    }
}

impl fmt::Display for FourCC {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str_lossy())
    }
}

#[derive(Debug, Clone)]
pub struct BoxHeader {
    pub size: u64,        // total size including header, 0 = extends to parent end
    pub typ: FourCC,
    pub uuid: Option<[u8; 16]>,
    pub header_size: u64, // 8, 16, 24 or 32
    pub start: u64,       // file offset of the header
}

impl BoxHeader {
    /// End offset of the box, resolving `size == 0` against the parent.
    /// Headers from [`read_box_header`](crate::parser::read_box_header) never
    /// overflow; hand-built ones saturate.
    pub fn end(&self, parent_end: u64) -> u64 {
        if self.size == 0 { parent_end } else { self.start.saturating_add(self.size) }
    }
}

#[derive(Debug)]
pub enum NodeKind {
    Container(Vec<BoxRef>),
    FullBox { version: u8, flags: u32, data_offset: u64, data_len: u64 },
    Leaf { data_offset: u64, data_len: u64 },
}

#[derive(Debug)]
pub struct BoxRef {
    pub hdr: BoxHeader,
    pub kind: NodeKind,
}

impl BoxRef {
    pub fn is(&self, typ: &[u8; 4]) -> bool {
        &self.hdr.typ.0 == typ
    }

    pub fn children(&self) -> &[BoxRef] {
        match &self.kind {
            NodeKind::Container(kids) => kids,
            _ => &[],
        }
    }

    pub fn child(&self, typ: &[u8; 4]) -> Option<&BoxRef> {
        self.children().iter().find(|c| c.is(typ))
    }

    /// Follow a path of box types, taking the first match at each level.
    pub fn descend(&self, path: &[&[u8; 4]]) -> Option<&BoxRef> {
        path.iter().try_fold(self, |node, typ| node.child(typ))
    }

    /// Payload location, after version/flags for full boxes. `None` for
    /// containers.
    pub fn payload(&self) -> Option<(u64, u64)> {
        match self.kind {
            NodeKind::FullBox { data_offset, data_len, .. }
            | NodeKind::Leaf { data_offset, data_len } => Some((data_offset, data_len)),
            NodeKind::Container(_) => None,
        }
    }

    pub fn version(&self) -> Option<u8> {
        match self.kind {
            NodeKind::FullBox { version, .. } => Some(version),
            _ => None,
        }
    }
}
