use std::fmt;

use crate::utils::io::{Decodeable, Encodeable};

pub const EMPTY_PAGE_ID: u32 = 0;

/// Every page belongs to exactly one of these categories. A root
/// pointer page is a permanent, never-relocated stub at `page_index`
/// 0 of every table's file; it exists purely so that "where is the
/// current root" survives root raises/lifts without anyone having to
/// rewrite a fixed external reference.
///
/// This consolidates what used to be two parallel `PageCategory`
/// definitions in the teacher corpus into one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PageCategory {
    RootPointer,
    Internal,
    Leaf,
    Header,
}

impl PageCategory {
    fn tag(&self) -> u32 {
        match self {
            PageCategory::RootPointer => 0,
            PageCategory::Internal => 1,
            PageCategory::Leaf => 2,
            PageCategory::Header => 3,
        }
    }

    fn from_tag(tag: u32) -> PageCategory {
        match tag {
            0 => PageCategory::RootPointer,
            1 => PageCategory::Internal,
            2 => PageCategory::Leaf,
            3 => PageCategory::Header,
            _ => panic!("unknown page category tag: {}", tag),
        }
    }
}

impl fmt::Display for PageCategory {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            PageCategory::RootPointer => "ROOT_POINTER",
            PageCategory::Internal => "INTERNAL",
            PageCategory::Leaf => "LEAF",
            PageCategory::Header => "HEADER",
        };
        write!(f, "{}", s)
    }
}

/// `(space, page_no)` per §6: `table_id` plays the role of `space_id`
/// (which index this page belongs to), `page_index` the role of
/// `page_no`. Arena-style key: pages never hold native references to
/// each other, only this id, resolved afresh through the page cache
/// on every access -- see the "cyclic graphs / back-pointers" design
/// note.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BTreePageID {
    pub category: PageCategory,
    pub table_id: u32,
    pub page_index: u32,
}

impl BTreePageID {
    pub fn new(category: PageCategory, table_id: u32, page_index: u32) -> BTreePageID {
        BTreePageID {
            category,
            table_id,
            page_index,
        }
    }
}

impl fmt::Display for BTreePageID {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "<{}, table: {}, page: {}>",
            self.category, self.table_id, self.page_index
        )
    }
}

impl Encodeable for BTreePageID {
    fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(12);
        buf.extend(self.category.tag().to_be_bytes());
        buf.extend(self.table_id.to_be_bytes());
        buf.extend(self.page_index.to_be_bytes());
        buf
    }
}

impl Decodeable for BTreePageID {
    fn decode(bytes: &[u8]) -> Self {
        let category = PageCategory::from_tag(u32::from_be_bytes([
            bytes[0], bytes[1], bytes[2], bytes[3],
        ]));
        let table_id = u32::from_be_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
        let page_index = u32::from_be_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]);
        BTreePageID {
            category,
            table_id,
            page_index,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_category_display() {
        assert_eq!(format!("{}", PageCategory::Leaf), "LEAF");
    }

    #[test]
    fn test_page_id_roundtrip() {
        let pid = BTreePageID::new(PageCategory::Internal, 7, 42);
        let bytes = pid.encode();
        let decoded = BTreePageID::decode(&bytes);
        assert_eq!(pid, decoded);
    }
}
