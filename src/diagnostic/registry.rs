/// Help text for one stable error code. `short` feeds `--list-errors`,
/// `long` is the markdown printed by `--explain`.
#[derive(Debug)]
pub struct ErrorEntry {
    pub code: &'static str,
    pub short: &'static str,
    pub long: &'static str,
}

/// One entry per [`ErrorKind`](super::ErrorKind), in code order.
pub static REGISTRY: &[ErrorEntry] = &[
    // ── Structural ───────────────────────────────────────────────────────────
    ErrorEntry {
        code: "ESO-S001",
        short: "loop close without a matching open",
        long: r#"## ESO-S001: mismatched bracket

A loop-close instruction was found while no loop-open was pending.
In Brainfuck this is `]`, in COW it is `moo`.

**Example:**

    ++]        -- `]` has no `[` before it
    moomoo     -- `moo` has no `MOO` before it
"#,
    },
    ErrorEntry {
        code: "ESO-S002",
        short: "loop open never closed",
        long: r#"## ESO-S002: trailing bracket

The program ended while a loop-open instruction (`[` or `MOO`) was
still waiting for its partner.

**Fix:** add the missing `]` / `moo`, or remove the opener.
"#,
    },
    ErrorEntry {
        code: "ESO-S003",
        short: "incomplete command at end of program",
        long: r#"## ESO-S003: trailing command

The program ends part way through a command.

- COW: after dropping every character other than `m`, `o`, `M`, `O`
  the remaining text must split evenly into three-letter commands.
- Whitespace: the final tokens start a command that is never finished.
"#,
    },
    ErrorEntry {
        code: "ESO-S004",
        short: "Befunge program can never terminate",
        long: r#"## ESO-S004: no termination

A Befunge program must contain at least one `@` and an even number of
`"` characters. Without `@` the program cannot halt; with an odd
number of quotes string mode never closes.
"#,
    },
    ErrorEntry {
        code: "ESO-S005",
        short: "unknown symbol or command",
        long: r#"## ESO-S005: unknown symbol

The instruction under the instruction pointer is not part of the
language. In Befunge the error names the character and its grid
position. In COW it is a three-letter group that is not a command.
In Whitespace the accumulated tokens cannot start any command.
"#,
    },

    // ── Runtime ──────────────────────────────────────────────────────────────
    ErrorEntry {
        code: "ESO-R001",
        short: "mOO selected an invalid instruction",
        long: r#"## ESO-R001: invalid opcode selection

COW's `mOO` replaces itself with the instruction numbered by the
current cell. Valid numbers are 0 to 10, except 3 (`mOO` itself,
which would repeat forever).
"#,
    },
    ErrorEntry {
        code: "ESO-R002",
        short: "pop from empty stack",
        long: r#"## ESO-R002: empty stack

An instruction needed a value from the stack but the stack was empty.
Duplicate, swap and the conditional branches treat a missing value
as 0; every other consumer fails.
"#,
    },
    ErrorEntry {
        code: "ESO-R003",
        short: "invalid number literal",
        long: r#"## ESO-R003: invalid number

A Whitespace number is a sign (space for +, tab for -) followed by at
least one binary digit and terminated by a newline. A sign with no
digits is rejected, as is a value that does not fit in 64 bits.
"#,
    },
    ErrorEntry {
        code: "ESO-R004",
        short: "value is not a character",
        long: r#"## ESO-R004: invalid character

A print-character instruction popped a value that is not a Unicode
scalar value (negative, a surrogate, or above U+10FFFF).
"#,
    },
    ErrorEntry {
        code: "ESO-R005",
        short: "division by zero",
        long: r#"## ESO-R005: division by zero

Division or modulo with a zero divisor.
"#,
    },

    // ── Resources ────────────────────────────────────────────────────────────
    ErrorEntry {
        code: "ESO-X001",
        short: "step limit exceeded",
        long: r#"## ESO-X001: step limit exceeded

The program executed the maximum number of fetch cycles without
halting. Befunge programs are limited to 100000 cycles by default;
`--max-steps` changes the ceiling.
"#,
    },
    ErrorEntry {
        code: "ESO-X002",
        short: "cancelled by caller",
        long: r#"## ESO-X002: cancelled

The caller tripped the cancel token. Engines check it between fetch
cycles, so the program stopped at a cycle boundary.
"#,
    },
    ErrorEntry {
        code: "ESO-X003",
        short: "timed out",
        long: r#"## ESO-X003: timed out

The program ran longer than the wall-clock timeout (`--timeout-ms`).
"#,
    },

    // ── Progress ─────────────────────────────────────────────────────────────
    ErrorEntry {
        code: "ESO-L001",
        short: "loop made no progress",
        long: r#"## ESO-L001: infinite loop

A loop reached its close instruction with the current cell holding
the same non-zero value as on the previous pass, so it is assumed to
run forever.

This is a heuristic: a loop that moves the pointer across cells that
happen to hold equal values (such as `[>]` over a run of 1s) is also
reported.
"#,
    },
];

/// Finds the entry for `code`, ignoring ASCII case (`eso-r002` works).
pub fn lookup(code: &str) -> Option<&'static ErrorEntry> {
    REGISTRY.iter().find(|e| e.code.eq_ignore_ascii_case(code))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostic::ErrorKind;

    #[test]
    fn every_kind_is_documented() {
        for kind in ErrorKind::ALL {
            let entry = lookup(kind.code()).unwrap_or_else(|| panic!("{kind} has no registry entry"));
            assert!(!entry.short.is_empty(), "{} has no summary", entry.code);
            assert!(entry.long.contains(entry.code), "{} long text never names its code", entry.code);
        }
        assert_eq!(REGISTRY.len(), ErrorKind::ALL.len());
    }

    #[test]
    fn registry_is_in_code_order() {
        let codes: Vec<&str> = REGISTRY.iter().map(|e| e.code).collect();
        let expected: Vec<&str> = ErrorKind::ALL.iter().map(|k| k.code()).collect();
        assert_eq!(codes, expected);
    }

    #[test]
    fn lookup_is_case_insensitive() {
        assert_eq!(lookup("eso-s004").map(|e| e.code), Some("ESO-S004"));
        assert_eq!(lookup("Eso-X001").map(|e| e.code), Some("ESO-X001"));
    }

    #[test]
    fn unknown_codes_are_absent() {
        assert!(lookup("ESO-Z999").is_none());
        assert!(lookup("S001").is_none());
        assert!(lookup("").is_none());
    }
}
