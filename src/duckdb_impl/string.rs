use libduckdb_sys::duckdb_string_t;
use std::borrow::Cow;

/// Borrow the text of a DuckDB string value, replacing invalid UTF-8.
///
/// # Safety
///
/// `s` must point into a non-NULL `duckdb_string_t` vector row provided by DuckDB for the
/// active scalar invocation. Callers must perform row null checks first.
pub unsafe fn decode_duckdb_string(s: &duckdb_string_t) -> Cow<'_, str> {
    // SAFETY: The length prefix is shared by both union layouts.
    let len = unsafe { s.value.inlined.length } as usize;
    if len == 0 {
        return Cow::Borrowed("");
    }

    let bytes = if len <= 12 {
        // SAFETY: `len <= 12` selects the inlined layout, which holds `len` initialized bytes.
        let inlined = unsafe { &s.value.inlined.inlined };
        // SAFETY: see above; the slice borrows from `s`.
        unsafe { std::slice::from_raw_parts(inlined.as_ptr() as *const u8, len) }
    } else {
        // SAFETY: Longer strings use the pointer layout; DuckDB keeps `len` bytes alive at `ptr`
        // for the duration of the invocation.
        let ptr = unsafe { s.value.pointer.ptr };
        // SAFETY: see above.
        unsafe { std::slice::from_raw_parts(ptr as *const u8, len) }
    };

    String::from_utf8_lossy(bytes)
}
