const DELETED: u8 = 1 << 0;
const FEATURE: u8 = 1 << 1;

/// Per element status flags of a [`QuadMesh`](crate::QuadMesh).
///
/// `feature` marks edges that were explicitly requested, as opposed to edges
/// created implicitly by adding a face.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
pub struct Status {
    flags: u8,
}

impl Status {
    fn check(&self, i: u8) -> bool {
        self.flags & i > 0
    }

    fn set(&mut self, i: u8, flag: bool) {
        if flag {
            self.flags |= i;
        } else {
            self.flags &= !i;
        }
    }

    pub fn deleted(&self) -> bool {
        self.check(DELETED)
    }

    pub fn set_deleted(&mut self, flag: bool) {
        self.set(DELETED, flag);
    }

    pub fn feature(&self) -> bool {
        self.check(FEATURE)
    }

    pub fn set_feature(&mut self, flag: bool) {
        self.set(FEATURE, flag)
    }
}

#[cfg(test)]
mod test {
    use super::Status;

    #[test]
    fn t_flags_are_independent() {
        let mut status = Status::default();
        assert!(!status.deleted() && !status.feature());
        status.set_feature(true);
        assert!(status.feature() && !status.deleted());
        status.set_deleted(true);
        assert!(status.feature() && status.deleted());
        status.set_feature(false);
        assert!(!status.feature() && status.deleted());
    }
}
