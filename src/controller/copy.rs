use super::mode::CopyMode;
use super::session::Session;
use crate::document_model::registers::{is_read_only, is_register_name};
use crate::error::{EngineError, EngineResult};
use crate::host::Buffer;

impl Session {
    /// Fails early when the pending `"x` prefix names a register that cannot be written.
    pub(crate) fn check_register_writable(&self) -> EngineResult<()> {
        match self.state.register {
            Some(r) if is_read_only(r) => Err(EngineError::ReadOnlyRegister(r)),
            Some(r) if !is_register_name(r) => Err(EngineError::InvalidRegister(r)),
            _ => Ok(()),
        }
    }

    /// Copies `start..end` into the scratch text and on to the selected register,
    /// removing it from the buffer when `delete` is set.
    ///
    /// Repeated calls within one command accumulate. Linewise extension of the span is
    /// the caller's job; this only makes sure linewise text ends in a terminator.
    pub(crate) fn copy_internal(
        &mut self,
        buffer: &mut dyn Buffer,
        start: usize,
        end: usize,
        delete: bool,
        ensure_eol: bool,
    ) -> EngineResult<()> {
        self.check_register_writable()?;
        let text = buffer.text_range(start, end);
        self.state.internal_buffer.push_str(&text);
        if delete {
            buffer
                .delete_range(start, end)
                .map_err(|e| EngineError::host("delete", e))?;
        }
        let wants_eol = ensure_eol || self.state.copy_mode == CopyMode::Lines;
        if wants_eol && !self.state.internal_buffer.ends_with(['\n', '\r']) {
            let eol = buffer.eol().to_string();
            self.state.internal_buffer.push_str(&eol);
        }
        let copied = self.state.internal_buffer.clone();
        self.registers.write(self.state.register, &copied, delete)
    }

    /// Stores already-extracted text in the selected register.
    pub(crate) fn store_register(&mut self, text: &str, deleted: bool) -> EngineResult<()> {
        self.registers.write(self.state.register, text, deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document_model::TextBuffer;

    #[test]
    fn test_copy_accumulates_within_a_command() {
        let mut session = Session::new();
        let mut buffer = TextBuffer::from_text("abcdef");
        session.copy_internal(&mut buffer, 0, 1, true, false).unwrap();
        session.copy_internal(&mut buffer, 0, 1, true, false).unwrap();
        assert_eq!(buffer.text(), "cdef");
        assert_eq!(session.registers_mut().read(None, None).unwrap(), "ab");
    }

    #[test]
    fn test_linewise_copy_gets_terminator() {
        let mut session = Session::new();
        session.state.copy_mode = CopyMode::Lines;
        let mut buffer = TextBuffer::from_text("one\ntwo");
        session.copy_internal(&mut buffer, 4, 7, false, false).unwrap();
        assert_eq!(session.registers_mut().read(None, None).unwrap(), "two\n");
    }

    #[test]
    fn test_read_only_register_rejected_before_delete() {
        let mut session = Session::new();
        session.state.register = Some('.');
        let mut buffer = TextBuffer::from_text("abc");
        let err = session.copy_internal(&mut buffer, 0, 1, true, false).unwrap_err();
        assert_eq!(err, EngineError::ReadOnlyRegister('.'));
        assert_eq!(buffer.text(), "abc");
    }
}
