//! CAVLC 编码: 扫描列表 → 比特段队列.

use avcref_core::{AvcError, AvcResult, BitRun, BitRunQueue};
use log::trace;

use super::level::{encode_level, next_suffix_length};
use super::{CoeffTokenTable, zigzag_scan};
use crate::class::BlockClass;
use crate::tables::{
    CHROMA_DC_TOTAL_ZEROS_BITS, CHROMA_DC_TOTAL_ZEROS_LENS, RUN_BEFORE_BITS, RUN_BEFORE_LENS,
    TOTAL_ZEROS_BITS, TOTAL_ZEROS_LENS,
};

/// 单块编码结果的统计信息
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EncodedScan {
    /// 非零系数个数 (TotalCoeff)
    pub num_coeff: usize,
    /// 拖尾 ±1 个数 (0..=3)
    pub trailing_ones: usize,
    pub total_zeros: usize,
    /// 追加到队列的总位数
    pub bit_count: usize,
}

/// 编码光栅顺序的量化系数
pub fn encode_coefficients(
    coeffs: &[i32; 16],
    class: BlockClass,
    table: CoeffTokenTable,
    queue: &mut BitRunQueue,
) -> AvcResult<EncodedScan> {
    let scan = zigzag_scan(coeffs, class);
    encode_scan(&scan[..class.max_coeff()], table, queue)
}

/// 编码一个扫描列表 (长度即 max_coeff: 4 / 15 / 16), 比特段追加到 `queue`.
///
/// 追加顺序: coeff_token, 拖尾符号, level (高频到低频), total_zeros,
/// run_before (高频到低频).
pub fn encode_scan(
    scan: &[i32],
    table: CoeffTokenTable,
    queue: &mut BitRunQueue,
) -> AvcResult<EncodedScan> {
    let max_coeff = scan.len();
    if max_coeff == 0 || max_coeff > table.max_total_coeff() {
        return Err(AvcError::InvalidArgument(format!(
            "扫描长度 {} 与码表 {:?} 不匹配",
            max_coeff, table
        )));
    }

    let num_coeff = scan.iter().filter(|&&c| c != 0).count();
    let start_bits = queue.total_bits();

    // 拖尾 ±1: 从最高频向低频, 遇到幅度大于 1 的系数或满 3 个为止
    let mut trailing_ones = 0usize;
    let mut sign_bits = 0u32;
    if num_coeff > 0 {
        let mut i = max_coeff;
        loop {
            i -= 1;
            if scan[i] == 1 || scan[i] == -1 {
                sign_bits = (sign_bits << 1) | u32::from(scan[i] < 0);
                trailing_ones += 1;
            }
            if trailing_ones >= 3 || i == 0 || scan[i].abs() > 1 {
                break;
            }
        }
    }

    // coeff_token
    let (bits, len) = table.code(num_coeff, trailing_ones);
    queue.push(BitRun::new(bits, len)?)?;

    if trailing_ones > 0 {
        queue.push(BitRun::new(sign_bits, trailing_ones as u8)?)?;
    }

    // level: 跳过前 trailing_ones 个非零系数
    let mut suffix_length = u32::from(num_coeff > 10 && trailing_ones < 3);
    let mut seen = 0usize;
    for &level in scan.iter().rev().filter(|&&c| c != 0) {
        seen += 1;
        if seen <= trailing_ones {
            continue;
        }
        let first_adjust = trailing_ones < 3 && seen == trailing_ones + 1;
        queue.push(encode_level(level, suffix_length, first_adjust)?)?;
        suffix_length = next_suffix_length(suffix_length, level);
    }

    // total_zeros
    let last_sig = scan.iter().rposition(|&c| c != 0);
    let total_zeros = match last_sig {
        Some(last) => last + 1 - num_coeff,
        None => 0,
    };
    if num_coeff > 0 && num_coeff < max_coeff {
        let (bits, len) = if table == CoeffTokenTable::ChromaDc {
            (
                CHROMA_DC_TOTAL_ZEROS_BITS[num_coeff - 1][total_zeros],
                CHROMA_DC_TOTAL_ZEROS_LENS[num_coeff - 1][total_zeros],
            )
        } else {
            (
                TOTAL_ZEROS_BITS[num_coeff - 1][total_zeros],
                TOTAL_ZEROS_LENS[num_coeff - 1][total_zeros],
            )
        };
        queue.push(BitRun::new(u32::from(bits), len)?)?;
    }

    // run_before: 每个非零系数 (最低频的除外) 与下一个非零系数之间的零个数
    if let Some(last) = last_sig {
        let mut zeros_left = total_zeros;
        let mut coded = 0usize;
        let mut run = 0usize;
        let mut i = last;
        while coded + 1 < num_coeff && zeros_left > 0 && i > 0 {
            i -= 1;
            if scan[i] != 0 {
                let t = zeros_left.min(7) - 1;
                queue.push(BitRun::new(
                    u32::from(RUN_BEFORE_BITS[t][run]),
                    RUN_BEFORE_LENS[t][run],
                )?)?;
                coded += 1;
                zeros_left -= run;
                run = 0;
            } else {
                run += 1;
            }
        }
    }

    let bit_count = queue.total_bits() - start_bits;
    trace!(
        "CAVLC 编码: table={:?} num_coeff={} t1={} tz={} bits={}",
        table, num_coeff, trailing_ones, total_zeros, bit_count
    );

    Ok(EncodedScan {
        num_coeff,
        trailing_ones,
        total_zeros,
        bit_count,
    })
}
