//! CAVLC 解码: 比特段队列 → 扫描列表.
//!
//! 每个语法元素先取当前位置的 32 位窗口, 由前导零个数查码长 (含修正),
//! 再把窗口高位的码字与码表精确匹配.

use avcref_core::{AvcError, AvcResult, BitRunQueue};
use log::trace;

use super::level::{decode_level, next_suffix_length};
use super::{CoeffTokenTable, inverse_zigzag};
use crate::class::BlockClass;
use crate::tables::{
    CHROMA_DC_TOTAL_ZEROS_BITS, CHROMA_DC_TOTAL_ZEROS_LEAD_LENS, CHROMA_DC_TOTAL_ZEROS_LENS,
    CHROMA_DC_TOTAL_ZEROS_MAX_LEAD, COEFF_TOKEN_LEAD_LENS, COEFF_TOKEN_LEN_FIXES,
    COEFF_TOKEN_MAX_LEAD, LengthFix, RUN_BEFORE_BITS, RUN_BEFORE_LEAD_LENS, RUN_BEFORE_LEN_FIXES,
    RUN_BEFORE_LENS, RUN_BEFORE_MAX_LEAD, TOTAL_ZEROS_BITS, TOTAL_ZEROS_LEAD_LENS,
    TOTAL_ZEROS_LEN_FIXES, TOTAL_ZEROS_LENS, TOTAL_ZEROS_MAX_LEAD,
};

/// 单块解码结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DecodedScan {
    /// 扫描列表, 前 max_coeff 项有效
    pub scan: [i32; 16],
    pub num_coeff: usize,
    pub trailing_ones: usize,
    pub total_zeros: usize,
    /// 本块消耗的位数
    pub bits_consumed: usize,
}

// ============================================================
// 读取游标
// ============================================================

struct Cursor<'a> {
    queue: &'a BitRunQueue,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(queue: &'a BitRunQueue, pos: usize) -> Self {
        Self { queue, pos }
    }

    fn window(&self) -> u32 {
        self.queue.window(self.pos)
    }

    fn advance(&mut self, len: usize) -> AvcResult<()> {
        if self.pos + len > self.queue.total_bits() {
            return Err(AvcError::InvalidData(format!(
                "读取越过比特段队列末尾: 位置 {} + {} > {}",
                self.pos,
                len,
                self.queue.total_bits()
            )));
        }
        self.pos += len;
        Ok(())
    }

    fn read_bits(&mut self, n: usize) -> AvcResult<u32> {
        let v = self.queue.peek(self.pos, n as u32);
        self.advance(n)?;
        Ok(v)
    }
}

/// 第一个 1 的位置 (从 1 开始); 前 max_lead - 1 位全为 0 时返回 max_lead
fn lead_position(window: u32, max_lead: u32) -> u32 {
    let lz = window.leading_zeros();
    if lz + 1 < max_lead { lz + 1 } else { max_lead }
}

/// 查码长并应用修正
fn code_length(
    window: u32,
    table: usize,
    max_lead: u32,
    lens: &[u8],
    fixes: &[LengthFix],
) -> AvcResult<u8> {
    let lead = lead_position(window, max_lead);
    let mut len = lens[(lead - 1) as usize];
    for fix in fixes {
        if fix.table == table && fix.lead == lead && window & fix.mask == fix.mask {
            len -= 1;
        }
    }
    if len == 0 {
        return Err(AvcError::InvalidData(format!(
            "表 {} 前导位置 {} 无对应码长",
            table, lead
        )));
    }
    Ok(len)
}

/// 窗口高 `len` 位的码字
fn code_word(window: u32, len: u8) -> u32 {
    window >> (32 - u32::from(len))
}

// ============================================================
// 语法元素
// ============================================================

fn read_coeff_token(cursor: &mut Cursor<'_>, table: CoeffTokenTable) -> AvcResult<(usize, usize)> {
    let t = table.index();
    let window = cursor.window();
    let len = code_length(
        window,
        t,
        COEFF_TOKEN_MAX_LEAD[t],
        &COEFF_TOKEN_LEAD_LENS[t],
        &COEFF_TOKEN_LEN_FIXES,
    )?;
    let code = code_word(window, len);

    for total_coeff in 0..=table.max_total_coeff() {
        for trailing_ones in 0..=total_coeff.min(3) {
            if table.code(total_coeff, trailing_ones) == (code, len) {
                cursor.advance(usize::from(len))?;
                return Ok((total_coeff, trailing_ones));
            }
        }
    }
    Err(AvcError::InvalidData(format!(
        "coeff_token 码字 {:0width$b} 不在表 {:?} 中",
        code,
        table,
        width = usize::from(len)
    )))
}

fn read_total_zeros(cursor: &mut Cursor<'_>, num_coeff: usize, chroma_dc: bool) -> AvcResult<usize> {
    let t = num_coeff - 1;
    let window = cursor.window();
    let (len, bits, lens, max_tz): (u8, &[u8], &[u8], usize) = if chroma_dc {
        let len = code_length(
            window,
            t,
            CHROMA_DC_TOTAL_ZEROS_MAX_LEAD[t],
            &CHROMA_DC_TOTAL_ZEROS_LEAD_LENS[t],
            &[],
        )?;
        (
            len,
            &CHROMA_DC_TOTAL_ZEROS_BITS[t],
            &CHROMA_DC_TOTAL_ZEROS_LENS[t],
            4 - num_coeff,
        )
    } else {
        let len = code_length(
            window,
            t,
            TOTAL_ZEROS_MAX_LEAD[t],
            &TOTAL_ZEROS_LEAD_LENS[t],
            &TOTAL_ZEROS_LEN_FIXES,
        )?;
        (len, &TOTAL_ZEROS_BITS[t], &TOTAL_ZEROS_LENS[t], 16 - num_coeff)
    };
    let code = code_word(window, len);

    for tz in 0..=max_tz {
        if lens[tz] == len && u32::from(bits[tz]) == code {
            cursor.advance(usize::from(len))?;
            return Ok(tz);
        }
    }
    Err(AvcError::InvalidData(format!(
        "total_zeros 码字无效 (total_coeff={})",
        num_coeff
    )))
}

fn read_run_before(cursor: &mut Cursor<'_>, zeros_left: usize) -> AvcResult<usize> {
    let t = zeros_left.min(7) - 1;
    let window = cursor.window();
    let len = code_length(
        window,
        t,
        RUN_BEFORE_MAX_LEAD[t],
        &RUN_BEFORE_LEAD_LENS[t],
        &RUN_BEFORE_LEN_FIXES,
    )?;
    let code = code_word(window, len);
    let max_run = if t < 6 { zeros_left } else { 14 };

    for run in 0..=max_run {
        if RUN_BEFORE_LENS[t][run] == len && u32::from(RUN_BEFORE_BITS[t][run]) == code {
            cursor.advance(usize::from(len))?;
            return Ok(run);
        }
    }
    Err(AvcError::InvalidData(format!(
        "run_before 码字无效 (zeros_left={})",
        zeros_left
    )))
}

// ============================================================
// 块解码
// ============================================================

/// 从 `queue` 的第 `pos` 位开始解码一个块, 返回光栅顺序系数与解码信息
pub fn decode_coefficients(
    queue: &BitRunQueue,
    pos: usize,
    class: BlockClass,
    table: CoeffTokenTable,
) -> AvcResult<([i32; 16], DecodedScan)> {
    let decoded = decode_scan(queue, pos, class.max_coeff(), table)?;
    Ok((inverse_zigzag(&decoded.scan, class), decoded))
}

/// 从 `queue` 的第 `pos` 位开始解码一个长度为 `max_coeff` 的扫描列表
pub fn decode_scan(
    queue: &BitRunQueue,
    pos: usize,
    max_coeff: usize,
    table: CoeffTokenTable,
) -> AvcResult<DecodedScan> {
    if max_coeff == 0 || max_coeff > table.max_total_coeff() {
        return Err(AvcError::InvalidArgument(format!(
            "扫描长度 {} 与码表 {:?} 不匹配",
            max_coeff, table
        )));
    }

    let mut cursor = Cursor::new(queue, pos);
    let (num_coeff, trailing_ones) = read_coeff_token(&mut cursor, table)?;
    if num_coeff > max_coeff {
        return Err(AvcError::InvalidData(format!(
            "total_coeff {} 超过块容量 {}",
            num_coeff, max_coeff
        )));
    }

    let mut out = DecodedScan {
        num_coeff,
        trailing_ones,
        ..DecodedScan::default()
    };
    if num_coeff == 0 {
        out.bits_consumed = cursor.pos - pos;
        return Ok(out);
    }

    // level 列表: 高频到低频
    let mut levels = [0i32; 16];
    for level in levels.iter_mut().take(trailing_ones) {
        *level = if cursor.read_bits(1)? == 1 { -1 } else { 1 };
    }

    let mut suffix_length = u32::from(num_coeff > 10 && trailing_ones < 3);
    for (i, level) in levels.iter_mut().enumerate().take(num_coeff).skip(trailing_ones) {
        let first_adjust = trailing_ones < 3 && i == trailing_ones;
        let (value, len) = decode_level(cursor.window(), suffix_length, first_adjust)?;
        cursor.advance(usize::from(len))?;
        *level = value;
        suffix_length = next_suffix_length(suffix_length, value);
    }

    let total_zeros = if num_coeff < max_coeff {
        read_total_zeros(&mut cursor, num_coeff, table == CoeffTokenTable::ChromaDc)?
    } else {
        0
    };
    if total_zeros + num_coeff > max_coeff {
        return Err(AvcError::InvalidData(format!(
            "total_zeros {} + total_coeff {} 超过块容量 {}",
            total_zeros, num_coeff, max_coeff
        )));
    }

    let mut runs = [0usize; 16];
    let mut zeros_left = total_zeros;
    for run in runs.iter_mut().take(num_coeff - 1) {
        if zeros_left == 0 {
            break;
        }
        let r = read_run_before(&mut cursor, zeros_left)?;
        if r > zeros_left {
            return Err(AvcError::InvalidData(format!(
                "run_before {} 超过剩余零个数 {}",
                r, zeros_left
            )));
        }
        *run = r;
        zeros_left -= r;
    }
    runs[num_coeff - 1] = zeros_left;

    // 从最低频系数开始放回扫描位置
    let mut scan_pos = 0usize;
    for i in (0..num_coeff).rev() {
        scan_pos += runs[i];
        out.scan[scan_pos] = levels[i];
        scan_pos += 1;
    }

    out.total_zeros = total_zeros;
    out.bits_consumed = cursor.pos - pos;
    trace!(
        "CAVLC 解码: table={:?} num_coeff={} t1={} tz={} bits={}",
        table, num_coeff, trailing_ones, total_zeros, out.bits_consumed
    );
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cavlc::encode_scan;

    fn round_trip(scan: &[i32], table: CoeffTokenTable) -> DecodedScan {
        let mut queue = BitRunQueue::new();
        let enc = encode_scan(scan, table, &mut queue).unwrap();
        let dec = decode_scan(&queue, 0, scan.len(), table).unwrap();
        assert_eq!(&dec.scan[..scan.len()], scan, "表 {:?} 往返不一致", table);
        assert_eq!(dec.num_coeff, enc.num_coeff);
        assert_eq!(dec.trailing_ones, enc.trailing_ones);
        assert_eq!(dec.bits_consumed, enc.bit_count);
        dec
    }

    fn queue_from_str(bits: &str) -> BitRunQueue {
        let mut queue = BitRunQueue::new();
        for chunk in bits.as_bytes().chunks(16) {
            let s = std::str::from_utf8(chunk).unwrap();
            queue
                .push_bits(u32::from_str_radix(s, 2).unwrap(), s.len() as u8)
                .unwrap();
        }
        queue
    }

    #[test]
    fn test_standard_example_decodes() {
        // 0000100 011 1 0010 111 10 1 1 01, 末尾多 1 位不应被消耗
        let queue = queue_from_str("0000100011100101111011011");
        let dec = decode_scan(&queue, 0, 16, CoeffTokenTable::Nc0To1).unwrap();
        assert_eq!(&dec.scan[..8], &[0, 3, 0, 1, -1, -1, 0, 1]);
        assert!(dec.scan[8..].iter().all(|&c| c == 0));
        assert_eq!(dec.num_coeff, 5);
        assert_eq!(dec.total_zeros, 3);
        assert_eq!(dec.bits_consumed, 24);
    }

    #[test]
    fn test_round_trip_all_tables() {
        let mut scan = [0i32; 16];
        scan[..10].copy_from_slice(&[7, -2, 0, 1, 0, 0, -1, 1, 0, -1]);
        for table in [
            CoeffTokenTable::Nc0To1,
            CoeffTokenTable::Nc2To3,
            CoeffTokenTable::Nc4To7,
            CoeffTokenTable::Nc8Plus,
        ] {
            round_trip(&scan, table);
        }
        round_trip(&[3, 0, -1, 1], CoeffTokenTable::ChromaDc);
        round_trip(&[0, 0, 0, 1], CoeffTokenTable::ChromaDc);
    }

    #[test]
    fn test_round_trip_dense_and_large() {
        let scan: Vec<i32> = (0..16).map(|i| (i as i32 - 8) * 37 + 1).collect();
        let dec = round_trip(&scan, CoeffTokenTable::Nc8Plus);
        assert_eq!(dec.total_zeros, 0);

        let mut ac = [0i32; 15];
        ac[14] = 1;
        ac[0] = -120;
        round_trip(&ac, CoeffTokenTable::Nc2To3);
    }

    #[test]
    fn test_zero_run_patterns() {
        // 单个系数落在每一个扫描位置
        for pos in 0..16 {
            let mut scan = [0i32; 16];
            scan[pos] = if pos % 2 == 0 { 2 } else { -1 };
            round_trip(&scan, CoeffTokenTable::Nc0To1);
        }
        // 零游程超过 7 时使用最后一张 run_before 表
        let mut scan = [0i32; 16];
        scan[0] = 1;
        scan[1] = 1;
        scan[15] = 1;
        let dec = round_trip(&scan, CoeffTokenTable::Nc0To1);
        assert_eq!(dec.total_zeros, 13);
    }

    #[test]
    fn test_decode_at_offset() {
        let mut queue = BitRunQueue::new();
        queue.push_bits(0b101, 3).unwrap();
        let mut scan = [0i32; 15];
        scan[1] = 2;
        scan[4] = -1;
        encode_scan(&scan, CoeffTokenTable::Nc0To1, &mut queue).unwrap();
        let dec = decode_scan(&queue, 3, 15, CoeffTokenTable::Nc0To1).unwrap();
        assert_eq!(&dec.scan[..15], &scan);
        assert_eq!(3 + dec.bits_consumed, queue.total_bits());
    }

    #[test]
    fn test_malformed_token_rejected() {
        // nC >= 8 表中 6 位码字 000010 不对应任何 (total_coeff, trailing_ones)
        let queue = queue_from_str("000010");
        let err = decode_scan(&queue, 0, 16, CoeffTokenTable::Nc8Plus).unwrap_err();
        assert!(matches!(err, AvcError::InvalidData(_)));
    }

    #[test]
    fn test_truncated_stream_rejected() {
        let mut queue = BitRunQueue::new();
        let mut scan = [0i32; 16];
        scan[3] = 5;
        encode_scan(&scan, CoeffTokenTable::Nc0To1, &mut queue).unwrap();
        let bits = queue.to_bit_string();
        let truncated = queue_from_str(&bits[..bits.len() - 1]);
        assert!(decode_scan(&truncated, 0, 16, CoeffTokenTable::Nc0To1).is_err());
    }
}
