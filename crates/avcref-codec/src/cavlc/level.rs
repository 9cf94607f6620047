//! level_prefix / level_suffix 编解码.
//!
//! level 先映射为非负 level_code, 再按自适应的 suffix_length 拆成
//! 一元前缀和定长后缀. 超过阈值时使用 15 个 0 前缀 + 12 位后缀的转义形式.

use avcref_core::{AvcError, AvcResult, BitRun};

/// suffix_length = 0 时直接一元编码的 level_code 上限
pub const LEVEL_ESCAPE_SL0_SHORT: u32 = 14;
/// suffix_length = 0 时 14 前缀 + 4 位后缀可表示的 level_code 上限
pub const LEVEL_ESCAPE_SL0_LONG: u32 = 30;
/// 转义前缀长度 (level_prefix = 15)
pub const LEVEL_PREFIX_ESCAPE: u32 = 15;
pub const MAX_SUFFIX_LENGTH: u32 = 6;

/// 转义形式总位数: 15 个 0 + 1 + 12 位后缀
const ESCAPE_SIZE: u8 = 28;
const ESCAPE_SUFFIX_BITS: u32 = 12;
const ESCAPE_SUFFIX_LIMIT: u32 = 1 << ESCAPE_SUFFIX_BITS;

/// 编码完一个 level 后的 suffix_length
pub fn next_suffix_length(suffix_length: u32, level: i32) -> u32 {
    let mut sl = suffix_length;
    if sl == 0 {
        sl = 1;
    }
    if level.unsigned_abs() > (3 << (sl - 1)) && sl < MAX_SUFFIX_LENGTH {
        sl += 1;
    }
    sl
}

/// level 转为 level_code. `first_adjust` 为真时 (拖尾 1 少于 3 个后的
/// 第一个 level) 幅度至少为 2, 码值下移 2.
fn level_code(level: i32, first_adjust: bool) -> u32 {
    let code = if level > 0 {
        2 * (level.unsigned_abs() - 1)
    } else {
        2 * (level.unsigned_abs() - 1) + 1
    };
    if first_adjust { code - 2 } else { code }
}

/// 编码一个非零 level
pub fn encode_level(level: i32, suffix_length: u32, first_adjust: bool) -> AvcResult<BitRun> {
    if level == 0 {
        return Err(AvcError::Internal("level 不能为 0".into()));
    }
    if first_adjust && level.unsigned_abs() < 2 {
        return Err(AvcError::Internal(format!(
            "首个非拖尾 level 幅度不足 2: {}",
            level
        )));
    }
    let code = level_code(level, first_adjust);

    let (bits, size, escape) = if suffix_length == 0 {
        if code < LEVEL_ESCAPE_SL0_SHORT {
            (1, (code + 1) as u8, None)
        } else if code < LEVEL_ESCAPE_SL0_LONG {
            ((1 << 4) + code - LEVEL_ESCAPE_SL0_SHORT, 19, None)
        } else {
            let suffix = code - LEVEL_ESCAPE_SL0_LONG;
            (ESCAPE_SUFFIX_LIMIT + suffix, ESCAPE_SIZE, Some(suffix))
        }
    } else {
        let limit = LEVEL_PREFIX_ESCAPE << suffix_length;
        if code < limit {
            let mask = (1 << suffix_length) - 1;
            (
                (1 << suffix_length) + (code & mask),
                ((code >> suffix_length) + 1 + suffix_length) as u8,
                None,
            )
        } else {
            let suffix = code - limit;
            (ESCAPE_SUFFIX_LIMIT + suffix, ESCAPE_SIZE, Some(suffix))
        }
    };

    if let Some(suffix) = escape {
        if suffix >= ESCAPE_SUFFIX_LIMIT {
            return Err(AvcError::InvalidArgument(format!(
                "level {} 超出 12 位转义后缀的表示范围",
                level
            )));
        }
    }
    BitRun::new(bits, size)
}

/// 从 MSB 对齐的 32 位窗口解码一个 level, 返回 (level, 码长)
pub fn decode_level(window: u32, suffix_length: u32, first_adjust: bool) -> AvcResult<(i32, u8)> {
    let lead = window.leading_zeros() + 1;
    if lead > LEVEL_PREFIX_ESCAPE + 1 {
        return Err(AvcError::InvalidData(format!(
            "level_prefix 超过 {}",
            LEVEL_PREFIX_ESCAPE
        )));
    }

    let escape_suffix = (window >> (32 - u32::from(ESCAPE_SIZE))) & (ESCAPE_SUFFIX_LIMIT - 1);
    let (mut code, len) = if suffix_length == 0 {
        if lead < LEVEL_PREFIX_ESCAPE {
            (lead - 1, lead)
        } else if lead == LEVEL_PREFIX_ESCAPE {
            (LEVEL_ESCAPE_SL0_SHORT + ((window >> 13) & 0xF), 19)
        } else {
            (LEVEL_ESCAPE_SL0_LONG + escape_suffix, u32::from(ESCAPE_SIZE))
        }
    } else if lead <= LEVEL_PREFIX_ESCAPE {
        let mask = (1 << suffix_length) - 1;
        let len = lead + suffix_length;
        (((lead - 1) << suffix_length) + ((window >> (32 - len)) & mask), len)
    } else {
        (
            (LEVEL_PREFIX_ESCAPE << suffix_length) + escape_suffix,
            u32::from(ESCAPE_SIZE),
        )
    };

    if first_adjust {
        code += 2;
    }
    let level = if code & 1 == 1 {
        -((code as i32 + 1) >> 1)
    } else {
        (code as i32 + 2) >> 1
    };
    Ok((level, len as u8))
}
