//! Random code generation for the streaming producer.
//!
//! A code is a short string shaped by a format over the alphabet
//! {'0', 'a', 'A'}: each position draws a random digit, lowercase letter,
//! or uppercase letter. Codes travel NUL-terminated through the channel
//! so the drainer can split a bulk batch back into codes.

use anyhow::{Result, bail};

pub const MAX_CODE_CHARS: usize = 8;

pub struct CodeGen {
    state: u64,
    format: Vec<u8>,
}

impl CodeGen {
    pub fn new(format: &str, seed: u64) -> Result<Self> {
        if format.is_empty() || format.len() > MAX_CODE_CHARS {
            bail!("code format must be 1 to {} characters", MAX_CODE_CHARS);
        }
        if !format.bytes().all(|b| matches!(b, b'0' | b'a' | b'A')) {
            bail!("code format may only contain '0', 'a' and 'A'");
        }
        Ok(Self {
            state: if seed == 0 { 12345 } else { seed },
            format: format.as_bytes().to_vec(),
        })
    }

    fn next_u64(&mut self) -> u64 {
        self.state ^= self.state >> 12;
        self.state ^= self.state << 25;
        self.state ^= self.state >> 27;
        self.state.wrapping_mul(0x2545F4914F6CDD1D)
    }

    pub fn next_code(&mut self) -> String {
        let mut code = String::with_capacity(self.format.len());
        for i in 0..self.format.len() {
            let r = (self.next_u64() >> 32) as u32;
            let ch = match self.format[i] {
                b'0' => b'0' + (r % 10) as u8,
                b'a' => b'a' + (r % 26) as u8,
                _ => b'A' + (r % 26) as u8,
            };
            code.push(ch as char);
        }
        code
    }
}
