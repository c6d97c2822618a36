/// Generic bus interface for a Z80-style system: 16-bit memory addresses,
/// 8-bit data, and a separate 256-port I/O space.
///
/// Bus access never fails — every address is valid. The CPU core borrows
/// the bus for the duration of one `step()`; between steps the host is free
/// to inspect or rewrite memory.
pub trait Bus {
    fn read(&mut self, addr: u16) -> u8;
    fn write(&mut self, addr: u16, data: u8);

    /// Read from I/O port space (separate from memory on the Z80).
    /// Default maps to memory read; override for systems with real ports.
    fn io_read(&mut self, port: u8) -> u8 {
        self.read(port as u16)
    }

    /// Write to I/O port space (separate from memory on the Z80).
    /// Default maps to memory write; override for systems with real ports.
    fn io_write(&mut self, port: u8, data: u8) {
        self.write(port as u16, data)
    }
}
