//! Part planning and progress math.

/// One multipart part: 1-based part number and its byte range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartSpec {
    pub number: i32,
    pub offset: u64,
    pub len: u64,
}

/// Splits `total_size` bytes into fixed-size parts; the last part may be shorter.
///
/// An empty file is a single empty part, since a multipart upload needs at
/// least one part to complete.
pub fn plan_parts(total_size: u64, part_size: u64) -> Vec<PartSpec> {
    let part_size = part_size.max(1);
    if total_size == 0 {
        return vec![PartSpec {
            number: 1,
            offset: 0,
            len: 0,
        }];
    }

    let count = total_size.div_ceil(part_size);
    let mut out = Vec::with_capacity(count as usize);
    let mut offset = 0u64;
    let mut number = 1i32;
    while offset < total_size {
        let len = part_size.min(total_size - offset);
        out.push(PartSpec {
            number,
            offset,
            len,
        });
        offset += len;
        number += 1;
    }
    out
}

/// `floor(sent / total * 100)`, clamped to 100. Zero-byte totals report 0
/// until the job completes.
pub fn progress_percent(sent: u64, total: u64) -> u8 {
    if total == 0 {
        return 0;
    }
    let pct = (sent.min(total) as u128 * 100) / total as u128;
    pct as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_parts_even_and_remainder() {
        let parts = plan_parts(25, 10);
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], PartSpec { number: 1, offset: 0, len: 10 });
        assert_eq!(parts[1], PartSpec { number: 2, offset: 10, len: 10 });
        assert_eq!(parts[2], PartSpec { number: 3, offset: 20, len: 5 });

        let exact = plan_parts(30, 10);
        assert_eq!(exact.len(), 3);
        assert_eq!(exact[2].len, 10);
    }

    #[test]
    fn plan_parts_small_and_empty_files() {
        assert_eq!(plan_parts(3, 10), vec![PartSpec { number: 1, offset: 0, len: 3 }]);
        assert_eq!(plan_parts(0, 10), vec![PartSpec { number: 1, offset: 0, len: 0 }]);
    }

    #[test]
    fn plan_parts_covers_every_byte_once() {
        let total = 10 * 1024 * 1024 * 3 + 17;
        let parts = plan_parts(total, 10 * 1024 * 1024);
        assert_eq!(parts.len(), 4);
        let mut expected = 0;
        for p in &parts {
            assert_eq!(p.offset, expected);
            expected += p.len;
        }
        assert_eq!(expected, total);
    }

    #[test]
    fn progress_floors() {
        assert_eq!(progress_percent(0, 1000), 0);
        assert_eq!(progress_percent(429, 1000), 42);
        assert_eq!(progress_percent(999, 1000), 99);
        assert_eq!(progress_percent(1000, 1000), 100);
        assert_eq!(progress_percent(5000, 1000), 100);
        assert_eq!(progress_percent(0, 0), 0);
        assert_eq!(progress_percent(u64::MAX / 2, u64::MAX), 49);
    }
}
