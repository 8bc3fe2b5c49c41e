//! The content hash a kernel's `CheckSum` is derived from: Bob Jenkins' 96-bit mix, fed one
//! little-endian 32-bit word at a time, with a trailing partial word folded in byte by byte.

const SEED_A  : u32 = 0x428a_2f98;
const SEED_HI : u32 = 0x7137_4491;
const SEED_LO : u32 = 0xb5c0_fbcf;

#[derive(Clone, Debug)]
pub struct KernelHash {
  a  : u32,
  hi : u32,
  lo : u32,
}

impl Default for KernelHash {
  fn default() -> Self {
    KernelHash{ a: SEED_A, hi: SEED_HI, lo: SEED_LO }
  }
}

impl KernelHash {

  pub fn new() -> Self {
    KernelHash::default()
  }

  fn mix(&mut self) {
    let (mut a, mut b, mut c) = (self.a, self.hi, self.lo);
    a = a.wrapping_sub(b).wrapping_sub(c) ^ (c >> 13);
    b = b.wrapping_sub(c).wrapping_sub(a) ^ (a << 8);
    c = c.wrapping_sub(a).wrapping_sub(b) ^ (b >> 13);
    a = a.wrapping_sub(b).wrapping_sub(c) ^ (c >> 12);
    b = b.wrapping_sub(c).wrapping_sub(a) ^ (a << 16);
    c = c.wrapping_sub(a).wrapping_sub(b) ^ (b >> 5);
    a = a.wrapping_sub(b).wrapping_sub(c) ^ (c >> 3);
    b = b.wrapping_sub(c).wrapping_sub(a) ^ (a << 10);
    c = c.wrapping_sub(a).wrapping_sub(b) ^ (b >> 15);
    self.a  = a;
    self.hi = b;
    self.lo = c;
  }

  pub fn update(&mut self, data: &[u8]) {
    let mut words = data.chunks_exact(4);
    for word in &mut words {
      self.a ^= u32::from_le_bytes([word[0], word[1], word[2], word[3]]);
      self.mix();
    }

    let tail = words.remainder();
    if !tail.is_empty() {
      let value = tail.iter().fold(0u32, |value, &byte| (value | byte as u32) << 8);
      self.a ^= value;
      self.mix();
    }
  }

  pub fn finish(&self) -> u64 {
    ((self.hi as u64) << 32) | self.lo as u64
  }

  pub fn hash(data: &[u8]) -> u64 {
    let mut hash = KernelHash::new();
    hash.update(data);
    hash.finish()
  }
}

/// The value stored in a kernel header's `CheckSum`: the low half of the content hash.
pub fn kernel_checksum(kernel_blob: &[u8]) -> u32 {
  (KernelHash::hash(kernel_blob) & 0xFFFF_FFFF) as u32
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn empty_input_is_the_seed() {
    assert_eq!(KernelHash::hash(&[]), ((SEED_HI as u64) << 32) | SEED_LO as u64);
  }

  #[test]
  fn checksum_depends_on_every_byte() {
    let blob: Vec<u8> = (0..37u8).collect();
    let reference = kernel_checksum(&blob);
    assert_eq!(kernel_checksum(&blob), reference);

    for index in [0, 17, 35, 36] {
      let mut changed = blob.clone();
      changed[index] ^= 0x40;
      assert_ne!(kernel_checksum(&changed), reference, "byte {} ignored", index);
    }
  }
}
