//! 4x4 整数变换.
//!
//! 正向变换与反变换各由行、列两次一维蝶形组成. `shift` 为奇数行/列的
//! 加权位移: AC/4x4 块取 1 (核心整数 DCT), DC 块取 0 (Hadamard).

/// 正向 4x4 变换, 输入输出均为光栅顺序
pub fn forward_4x4(block: &[i32; 16], shift: u32) -> [i32; 16] {
    let mut tmp = [0i32; 16];
    for row in 0..4 {
        let a = &block[row * 4..row * 4 + 4];
        let b0 = a[0] + a[3];
        let b1 = a[1] + a[2];
        let b2 = a[1] - a[2];
        let b3 = a[0] - a[3];
        tmp[row * 4] = b0 + b1;
        tmp[row * 4 + 1] = b2 + (b3 << shift);
        tmp[row * 4 + 2] = b0 - b1;
        tmp[row * 4 + 3] = b3 - (b2 << shift);
    }

    let mut out = [0i32; 16];
    for col in 0..4 {
        let d0 = tmp[col] + tmp[col + 12];
        let d1 = tmp[col + 4] + tmp[col + 8];
        let d2 = tmp[col + 4] - tmp[col + 8];
        let d3 = tmp[col] - tmp[col + 12];
        out[col] = d0 + d1;
        out[col + 4] = d2 + (d3 << shift);
        out[col + 8] = d0 - d1;
        out[col + 12] = d3 - (d2 << shift);
    }
    out
}

/// 反向 4x4 变换, 先行后列
pub fn inverse_4x4(coeffs: &[i32; 16], shift: u32) -> [i32; 16] {
    let mut tmp = [0i32; 16];
    for row in 0..4 {
        let f = &coeffs[row * 4..row * 4 + 4];
        let g0 = f[0] + f[2];
        let g1 = f[0] - f[2];
        let g2 = (f[1] >> shift) - f[3];
        let g3 = f[1] + (f[3] >> shift);
        tmp[row * 4] = g0 + g3;
        tmp[row * 4 + 1] = g1 + g2;
        tmp[row * 4 + 2] = g1 - g2;
        tmp[row * 4 + 3] = g0 - g3;
    }

    let mut out = [0i32; 16];
    for col in 0..4 {
        let k0 = tmp[col] + tmp[col + 8];
        let k1 = tmp[col] - tmp[col + 8];
        let k2 = (tmp[col + 4] >> shift) - tmp[col + 12];
        let k3 = tmp[col + 4] + (tmp[col + 12] >> shift);
        out[col] = k0 + k3;
        out[col + 4] = k1 + k2;
        out[col + 8] = k1 - k2;
        out[col + 12] = k0 - k3;
    }
    out
}

/// 反变换输出的残差还原: (m + 32) >> 6
pub fn scale_residual(m: &[i32; 16]) -> [i32; 16] {
    let mut res = [0i32; 16];
    for (r, &v) in res.iter_mut().zip(m.iter()) {
        *r = (v + 32) >> 6;
    }
    res
}
