//! Calling convention: bootstrap, `function`, `call` and `return`.
//!
//! A call frame, from low to high addresses:
//!
//! ```text
//! ARG ->  argument 0 .. argument n-1
//!         return address
//!         saved LCL, ARG, THIS, THAT
//! LCL ->  local 0 .. local k-1
//!         working stack
//! ```

use log::debug;

use super::{at_c, at_s, push_d, Translator};
use crate::ast::SourceCommand;
use crate::error::Result;
use crate::labels::{self, BOOTSTRAP_SCOPE};
use crate::ENTRY_POINT;

/// Stack base established by the bootstrap.
const STACK_BASE: u16 = 256;
/// Return address plus the four saved pointers.
const FRAME_WORDS: u16 = 5;

impl Translator {
    /// Point SP at the stack base, then `call Sys.init 0`. Should `Sys.init`
    /// ever return, execution parks in an idle loop.
    pub fn bootstrap(&mut self) {
        debug!("emitting bootstrap");
        let halt = format!("{}$halt", BOOTSTRAP_SCOPE);

        let mut out = svec![at_c(STACK_BASE), "D=A", "@SP", "M=D"];
        out.extend(self.call(BOOTSTRAP_SCOPE, ENTRY_POINT, 0));
        out.extend(svec![format!("({})", halt), at_s(&halt), "0;JMP"]);
        self.emit(out);
    }

    pub(super) fn function(
        &mut self,
        command: &SourceCommand,
        name: &str,
        n_vars: u16,
    ) -> Result<Vec<String>> {
        if let Some(reason) = labels::reserved_scope(name) {
            return self.invalid(command, reason);
        }
        // Labels of the previous function can no longer be defined.
        self.labels.resolve(&self.unit)?;
        self.current_function = Some(name.to_string());

        let mut out = svec![format!("({})", name)];
        for _ in 0..n_vars {
            out.extend(svec!["@SP", "M=M+1", "A=M-1", "M=0"]);
        }
        Ok(out)
    }

    /// `scope` owns the return-address label.
    pub(super) fn call(&mut self, scope: &str, name: &str, n_args: u16) -> Vec<String> {
        let site = self.next_call_site();
        let ret = format!("{}${}", scope, labels::return_label(site));

        let mut out = svec![at_s(&ret), "D=A"];
        out.extend(push_d());
        for saved in ["LCL", "ARG", "THIS", "THAT"] {
            out.extend(svec![at_s(saved), "D=M"]);
            out.extend(push_d());
        }
        out.extend(svec![
            "@SP",
            "D=M",
            at_c(FRAME_WORDS + n_args),
            "D=D-A",
            "@ARG",
            "M=D", // ARG = SP - 5 - nArgs
            "@SP",
            "D=M",
            "@LCL",
            "M=D", // LCL = SP
            at_s(name),
            "0;JMP",
            format!("({})", ret)
        ]);
        out
    }

    pub(super) fn return_() -> Vec<String> {
        let mut out = svec![
            "@LCL",
            "D=M",
            "@R13",
            "M=D", // R13 = frame
            at_c(FRAME_WORDS),
            "A=D-A",
            "D=M",
            "@R14",
            "M=D", // R14 = return address, before *ARG is overwritten
            "@SP",
            "AM=M-1",
            "D=M",
            "@ARG",
            "A=M",
            "M=D", // *ARG = return value
            "@ARG",
            "D=M+1",
            "@SP",
            "M=D" // SP = ARG + 1
        ];
        for restored in ["THAT", "THIS", "ARG", "LCL"] {
            out.extend(svec!["@R13", "AM=M-1", "D=M", at_s(restored), "M=D"]);
        }
        out.extend(svec!["@R14", "A=M", "0;JMP"]);
        out
    }
}
