//! Per-CPU-strip initialization callback.

use std::sync::Arc;

/// Callback invoked once per CPU strip at pool creation, in the style
/// of `mempool.h`'s `init_func(priv, addr, len, cpu)`: `priv` state is
/// simply the closure's own captures in the Rust form.
///
/// `addr` points at the start of that CPU's strip (`len` bytes, equal
/// to the pool's stride), and `cpu` is the CPU index the strip belongs
/// to.
pub type InitFn = Arc<dyn Fn(*mut u8, usize, i32) + Send + Sync>;
