//! C ABI over [`nes_core::Emulator`] for driving it frame by frame from a
//! host process (e.g. through `ctypes`).
//!
//! Every handle returned here is owned by the caller and must be released
//! with the matching free function. Functions taking a handle treat a null
//! pointer as a no-op. Panics are caught at the boundary and logged.

use log::{error, warn};
use nes_core::prelude::*;
use std::any::Any;
use std::ffi::{CStr, c_char, c_int};
use std::panic::{self, AssertUnwindSafe};
use std::ptr;
use std::slice;

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "unknown panic"
    }
}

/// Runs `f`, logging and swallowing any panic so it never unwinds into C
fn guarded<T>(name: &str, fallback: T, f: impl FnOnce() -> T) -> T {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(value) => value,
        Err(payload) => {
            error!("{name} panicked: {}", panic_message(payload.as_ref()));
            fallback
        }
    }
}

/// # Safety
///
/// `handle` must be null or a live pointer returned by `Initialize`
unsafe fn emulator<'a>(handle: *mut Emulator) -> Option<&'a mut Emulator> {
    let emulator = unsafe { handle.as_mut() };
    if emulator.is_none() {
        warn!("null emulator handle");
    }
    emulator
}

#[unsafe(no_mangle)]
pub extern "C" fn Width() -> c_int {
    SCREEN_WIDTH as c_int
}

#[unsafe(no_mangle)]
pub extern "C" fn Height() -> c_int {
    SCREEN_HEIGHT as c_int
}

/// Loads the iNES file at `path` (UTF-8, NUL-terminated).
///
/// Returns null when the path is invalid or the cartridge is rejected.
///
/// # Safety
///
/// `path` must be null or point to a NUL-terminated string
#[unsafe(no_mangle)]
pub unsafe extern "C" fn Initialize(path: *const c_char, headless: bool) -> *mut Emulator {
    let _ = env_logger::try_init();

    if path.is_null() {
        error!("Initialize called with a null path");
        return ptr::null_mut();
    }
    let path = match unsafe { CStr::from_ptr(path) }.to_str() {
        Ok(path) => path.to_owned(),
        Err(err) => {
            error!("ROM path is not valid UTF-8: {err}");
            return ptr::null_mut();
        }
    };

    guarded("Initialize", ptr::null_mut(), || {
        match Emulator::from_file(&path, headless) {
            Ok(emulator) => Box::into_raw(Box::new(emulator)),
            Err(err) => {
                error!("Failed to load {path}: {err}");
                ptr::null_mut()
            }
        }
    })
}

/// Button byte of controller `port` (0 or 1), or null for any other port
///
/// # Safety
///
/// `handle` must be null or a live emulator handle
#[unsafe(no_mangle)]
pub unsafe extern "C" fn Controller(handle: *mut Emulator, port: c_int) -> *mut u8 {
    let Some(emulator) = (unsafe { emulator(handle) }) else {
        return ptr::null_mut();
    };
    usize::try_from(port)
        .ok()
        .and_then(|port| emulator.controller(port))
        .map_or(ptr::null_mut(), |buttons| buttons as *mut u8)
}

/// `Width() * Height()` pixels, 0x00RRGGBB
///
/// # Safety
///
/// `handle` must be null or a live emulator handle
#[unsafe(no_mangle)]
pub unsafe extern "C" fn Screen(handle: *mut Emulator) -> *const u32 {
    match unsafe { emulator(handle) } {
        Some(emulator) => emulator.screen().as_ptr(),
        None => ptr::null(),
    }
}

/// The 2 KiB of internal RAM, writable
///
/// # Safety
///
/// `handle` must be null or a live emulator handle
#[unsafe(no_mangle)]
pub unsafe extern "C" fn Memory(handle: *mut Emulator) -> *mut u8 {
    match unsafe { emulator(handle) } {
        Some(emulator) => emulator.memory_mut().as_mut_ptr(),
        None => ptr::null_mut(),
    }
}

/// # Safety
///
/// `handle` must be null or a live emulator handle
#[unsafe(no_mangle)]
pub unsafe extern "C" fn Reset(handle: *mut Emulator) {
    if let Some(emulator) = unsafe { emulator(handle) } {
        guarded("Reset", (), || emulator.reset());
    }
}

/// Runs one frame
///
/// # Safety
///
/// `handle` must be null or a live emulator handle
#[unsafe(no_mangle)]
pub unsafe extern "C" fn Step(handle: *mut Emulator) {
    if let Some(emulator) = unsafe { emulator(handle) } {
        guarded("Step", (), || emulator.step());
    }
}

/// # Safety
///
/// `handle` must be null or a live emulator handle
#[unsafe(no_mangle)]
pub unsafe extern "C" fn Backup(handle: *mut Emulator) {
    if let Some(emulator) = unsafe { emulator(handle) } {
        guarded("Backup", (), || emulator.backup());
    }
}

/// # Safety
///
/// `handle` must be null or a live emulator handle
#[unsafe(no_mangle)]
pub unsafe extern "C" fn Restore(handle: *mut Emulator) {
    if let Some(emulator) = unsafe { emulator(handle) } {
        guarded("Restore", (), || emulator.restore());
    }
}

/// Releases an emulator returned by `Initialize`
///
/// # Safety
///
/// `handle` must be null or a live emulator handle, not used afterwards
#[unsafe(no_mangle)]
pub unsafe extern "C" fn Close(handle: *mut Emulator) {
    if !handle.is_null() {
        drop(unsafe { Box::from_raw(handle) });
    }
}

/// Snapshot handle, released with `FreeState`
///
/// # Safety
///
/// `handle` must be null or a live emulator handle
#[unsafe(no_mangle)]
pub unsafe extern "C" fn SaveState(handle: *mut Emulator) -> *mut SavedState {
    match unsafe { emulator(handle) } {
        Some(emulator) => guarded("SaveState", ptr::null_mut(), || {
            Box::into_raw(Box::new(emulator.save_state()))
        }),
        None => ptr::null_mut(),
    }
}

/// # Safety
///
/// `handle` must be null or a live emulator handle; `state` must be null or
/// a live pointer returned by `SaveState`
#[unsafe(no_mangle)]
pub unsafe extern "C" fn LoadState(handle: *mut Emulator, state: *const SavedState) {
    let Some(emulator) = (unsafe { emulator(handle) }) else {
        return;
    };
    match unsafe { state.as_ref() } {
        Some(state) => guarded("LoadState", (), || emulator.load_state(state)),
        None => warn!("LoadState called with a null state"),
    }
}

/// # Safety
///
/// `state` must be null or a live pointer returned by `SaveState`, not used
/// afterwards
#[unsafe(no_mangle)]
pub unsafe extern "C" fn FreeState(state: *mut SavedState) {
    if !state.is_null() {
        drop(unsafe { Box::from_raw(state) });
    }
}

/// Encodes the machine state into a new buffer and stores its length in
/// `size_out`. Release it with `free_buffer(buffer, size)`.
///
/// # Safety
///
/// `handle` must be null or a live emulator handle; `size_out` must be
/// null or writable
#[unsafe(no_mangle)]
pub unsafe extern "C" fn serialize(handle: *mut Emulator, size_out: *mut usize) -> *mut u8 {
    let Some(emulator) = (unsafe { emulator(handle) }) else {
        return ptr::null_mut();
    };
    if size_out.is_null() {
        error!("serialize called with a null size pointer");
        return ptr::null_mut();
    }

    let buffer = guarded("serialize", None, || Some(emulator.serialize().into_boxed_slice()));
    match buffer {
        Some(buffer) => {
            unsafe { *size_out = buffer.len() };
            Box::into_raw(buffer) as *mut u8
        }
        None => {
            unsafe { *size_out = 0 };
            ptr::null_mut()
        }
    }
}

/// # Safety
///
/// `buffer` and `size` must come from one `serialize` call, and the buffer
/// must not be used afterwards
#[unsafe(no_mangle)]
pub unsafe extern "C" fn free_buffer(buffer: *mut u8, size: usize) {
    if !buffer.is_null() {
        drop(unsafe { Box::from_raw(ptr::slice_from_raw_parts_mut(buffer, size)) });
    }
}

/// Loads a buffer produced by `serialize` for the same cartridge
///
/// # Safety
///
/// `handle` must be null or a live emulator handle; `buffer` must be null
/// or point to `size` readable bytes
#[unsafe(no_mangle)]
pub unsafe extern "C" fn deserialize(handle: *mut Emulator, buffer: *const u8, size: usize) {
    let Some(emulator) = (unsafe { emulator(handle) }) else {
        return;
    };
    if buffer.is_null() {
        warn!("deserialize called with a null buffer");
        return;
    }
    let bytes = unsafe { slice::from_raw_parts(buffer, size) };
    guarded("deserialize", (), || emulator.deserialize(bytes));
}

#[cfg(test)]
mod test {
    use super::*;
    use std::ffi::CString;

    #[test]
    fn test_dimensions() {
        assert_eq!((Width(), Height()), (256, 240));
    }

    #[test]
    fn test_missing_rom_returns_null() {
        let path = CString::new("/nonexistent/game.nes").unwrap();
        let handle = unsafe { Initialize(path.as_ptr(), true) };
        assert!(handle.is_null());
        assert!(unsafe { Initialize(ptr::null(), true) }.is_null());
    }

    #[test]
    fn test_null_handles_are_ignored() {
        let handle = ptr::null_mut();
        unsafe {
            Step(handle);
            Reset(handle);
            Backup(handle);
            Restore(handle);
            Close(handle);
            FreeState(ptr::null_mut());
            free_buffer(ptr::null_mut(), 0);
            assert!(Screen(handle).is_null());
            assert!(Memory(handle).is_null());
            assert!(Controller(handle, 0).is_null());
            assert!(SaveState(handle).is_null());
        }
    }

    /// Writes a NOP-sled NROM image to a temp file, named per test
    fn rom_file(name: &str) -> (std::path::PathBuf, CString) {
        let mut rom = vec![b'N', b'E', b'S', 0x1A, 1, 1, 0, 0];
        rom.resize(16, 0);
        // reset vector at $8000
        let mut prg = vec![0xEA; 0x4000];
        prg[0x3FFD] = 0x80;
        rom.extend_from_slice(&prg);
        rom.extend_from_slice(&[0; 0x2000]);

        let path = std::env::temp_dir().join(format!("nes-env-{name}-{}.nes", std::process::id()));
        std::fs::write(&path, &rom).unwrap();
        let c_path = CString::new(path.to_str().unwrap()).unwrap();
        (path, c_path)
    }

    #[test]
    fn test_round_trip_through_the_boundary() {
        let (path, c_path) = rom_file("round-trip");

        unsafe {
            let handle = Initialize(c_path.as_ptr(), false);
            assert!(!handle.is_null());
            assert!(Controller(handle, 2).is_null());
            // fetched once, like a host does at construction
            let memory = Memory(handle);
            let screen = Screen(handle);
            assert!(!screen.is_null());
            *Controller(handle, 0) = 0x01;
            *memory.add(0x10) = 0x42;

            Step(handle);
            let mut size = 0;
            let buffer = serialize(handle, &mut size);
            assert!(size > 0);
            let saved = slice::from_raw_parts(buffer, size).to_vec();

            let state = SaveState(handle);
            *memory.add(0x10) = 0x43;
            Step(handle);
            LoadState(handle, state);
            FreeState(state);
            assert_eq!(*memory.add(0x10), 0x42);

            *memory.add(0x10) = 0x44;
            Step(handle);
            deserialize(handle, buffer, size);
            free_buffer(buffer, size);

            let mut size_after = 0;
            let again = serialize(handle, &mut size_after);
            assert_eq!(slice::from_raw_parts(again, size_after), saved.as_slice());
            assert_eq!(*memory.add(0x10), 0x42);
            free_buffer(again, size_after);

            Close(handle);
        }
        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_cached_views_survive_state_loads() {
        let (path, c_path) = rom_file("views");

        unsafe {
            let handle = Initialize(c_path.as_ptr(), false);
            assert!(!handle.is_null());
            let memory = Memory(handle);
            let screen = Screen(handle);

            Step(handle);
            Backup(handle);
            Step(handle);
            Restore(handle);
            assert_eq!(Memory(handle), memory);
            assert_eq!(Screen(handle), screen);

            let mut size = 0;
            let buffer = serialize(handle, &mut size);
            Step(handle);
            deserialize(handle, buffer, size);
            free_buffer(buffer, size);
            assert_eq!(Memory(handle), memory);
            assert_eq!(Screen(handle), screen);

            // writes through the cached view reach the machine
            *memory.add(0x0123) = 0x7E;
            Step(handle);
            let mut size = 0;
            let buffer = serialize(handle, &mut size);
            let state = slice::from_raw_parts(buffer, size);
            // RAM is the first run in the state, after its u64 length
            assert_eq!(state[8 + 0x0123], 0x7E);
            free_buffer(buffer, size);

            Close(handle);
        }
        std::fs::remove_file(path).unwrap();
    }
}
