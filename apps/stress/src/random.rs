pub struct Lcg {
    state: u32,
}

impl Lcg {
    pub fn new(seed: u32) -> Self {
        Lcg { state: seed }
    }

    pub fn next(&mut self) -> u32 {
        self.state = self.state.wrapping_mul(1103515245).wrapping_add(12345);
        self.state
    }

    // Picks from min..=max using the stronger high bits.
    pub fn next_range(&mut self, min: u32, max: u32) -> u32 {
        let range = max - min + 1;
        min + ((self.next() >> 16) % range)
    }
}
