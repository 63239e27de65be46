#[cfg(test)]
mod tests {
    use crate::virtual_machine::isa::{MAX_PARAMS, Opcode, ParamKind, Word};
    use std::collections::HashSet;

    macro_rules! collect_isa {
        (
            $( $(#[$doc:meta])* $name:ident = $opcode:literal, $mnemonic:literal => [ $( $field:ident : $kind:ident ),* $(,)? ] ),* $(,)?
        ) => {{
            vec![
                $( (Opcode::$name, $opcode as Word, $mnemonic, vec![$( ParamKind::$kind ),*]), )*
            ]
        }};
    }

    fn isa() -> Vec<(Opcode, Word, &'static str, Vec<ParamKind>)> {
        crate::for_each_instruction!(collect_isa)
    }

    #[test]
    fn opcodes_fit_in_two_digits_and_are_unique() {
        let table = isa();
        let codes: HashSet<Word> = table.iter().map(|(_, code, _, _)| *code).collect();
        assert_eq!(codes.len(), table.len());
        assert!(codes.iter().all(|code| (1..=99).contains(code)));
    }

    #[test]
    fn mnemonics_are_unique() {
        let table = isa();
        let mnemonics: HashSet<&str> = table.iter().map(|(_, _, m, _)| *m).collect();
        assert_eq!(mnemonics.len(), table.len());
    }

    #[test]
    fn layouts_match_generated_metadata() {
        for (opcode, code, mnemonic, params) in isa() {
            assert!(params.len() <= MAX_PARAMS);
            assert_eq!(opcode.code(), code);
            assert_eq!(opcode.mnemonic(), mnemonic);
            assert_eq!(opcode.params(), params.as_slice());
        }
    }

    #[test]
    fn destinations_come_last() {
        for (opcode, _, _, params) in isa() {
            if let Some(pos) = params.iter().position(|k| *k == ParamKind::Dst) {
                assert_eq!(pos, params.len() - 1, "{:?}", opcode);
            }
        }
    }
}
