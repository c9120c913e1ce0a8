use pretty_assertions::assert_eq;

use opcasm::output::ListingLine;
use opcasm::{assemble, AsmConfig, AsmError, Assembler, Assembly, EvalError, SizingMode};

fn run(src: &str) -> Assembly {
    assemble(src, AsmConfig::default()).unwrap()
}

fn run_with_listing(src: &str, sizing: SizingMode) -> (Assembly, Vec<ListingLine>) {
    let cfg = AsmConfig { sizing, ..AsmConfig::default() };
    let mut listing = Vec::new();
    let asm = Assembler::new(cfg).assemble(src, &mut listing).unwrap();
    (asm, listing)
}

fn words(asm: &Assembly, from: u16, n: u16) -> Vec<u16> {
    (from..from + n).map(|a| asm.image.read(a)).collect()
}

#[test]
fn countdown_program() {
    let src = "\
        ORG 0
start:  mov r1, r0, 10        # load counter
loop:   sub r1, r0, 1
        nz.mov pc, r0, loop
        halt r0, r0, 0x999
msg:    BSTRING \"Hi\"
";
    let asm = run(src);
    assert_eq!(
        words(&asm, 0, 10),
        vec![0x1001, 10, 0x1A01, 1, 0x700F, 2, 0x1000, 0x0999, 0x6948, 0x0000]
    );
    let syms: Vec<_> = asm.symbols.user_symbols().collect();
    assert_eq!(syms, vec![("start", 0), ("loop", 2), ("msg", 8)]);
}

#[test]
fn one_operand_form_fields() {
    let asm = run("ror r7\nnot r3\nbswp r12\n");
    for (addr, (opcode, dst)) in [(8u16, 7u16), (9, 3), (14, 12)].into_iter().enumerate() {
        let w = asm.image.read(addr as u16);
        assert_eq!(w >> 13, 0);
        assert_eq!(w & 0x1000, 0);
        assert_eq!((w >> 8) & 0xF, opcode);
        assert_eq!((w >> 4) & 0xF, 0);
        assert_eq!(w & 0xF, dst);
    }
}

#[test]
fn immediate_word_is_stored_unmodified() {
    let asm = run("add r2, r3, 0xFEDC\nadd r2, r3, -1\n");
    assert_eq!(words(&asm, 0, 4), vec![0x1432, 0xFEDC, 0x1432, 0xFFFF]);
}

#[test]
fn string_directives() {
    let asm = run("STRING \"AB\"\nORG 0x10\nBSTRING \"AB\"\n");
    assert_eq!(words(&asm, 0, 4), vec![0x0041, 0x0042, 0x0000, 0x0000]);
    assert_eq!(words(&asm, 0x10, 3), vec![0x4241, 0x0000, 0x0000]);
}

#[test]
fn strings_are_sized_in_the_first_pass() {
    let asm = run("    mov r1, r0, after\n    STRING \"abc\"\nafter: WORD 1\n");
    // mov (2) + "abc\0" (4)
    assert_eq!(asm.image.read(1), 6);
    assert_eq!(asm.image.read(6), 1);
}

#[test]
fn forward_references_resolve_to_final_layout() {
    let src = "\
        mov r1, r0, data
        add r1, r2
        cmp r1, r0, data + 1
data:   WORD 0xAAAA, 0xBBBB
";
    let asm = run(src);
    assert_eq!(asm.symbols.get("data"), Some(5));
    assert_eq!(asm.image.read(1), 5);
    assert_eq!(asm.image.read(4), 6);
    assert_eq!(words(&asm, 5, 2), vec![0xAAAA, 0xBBBB]);
}

#[test]
fn passes_agree_without_one_operand_forms() {
    let src = "\
a:      mov r1, r2
b:      add r1, r0, 3
c:      WORD 1, 2, 3
d:      STRING \"x\"
e:      z.ld r4, r5, a
f:      halt r0, r0, f
";
    let (asm, listing) = run_with_listing(src, SizingMode::Compatible);
    for line in &listing {
        if let Some((label, _)) = line.text.trim_start().split_once(':') {
            assert_eq!(asm.symbols.get(label), Some(line.addr), "{label}");
        }
    }
    assert_eq!(asm.symbols.get("f"), Some(10));
    assert_eq!(asm.image.read(11), 10);
}

// A 1-operand instruction emits one word but compatible sizing counts zero,
// so a forward reference across it lands one word early.
#[test]
fn compatible_sizing_undercounts_one_operand_forms() {
    let src = "\
        mov r2, r0, target
        ror r1
target: WORD 0x55
";
    let (asm, listing) = run_with_listing(src, SizingMode::Compatible);
    assert_eq!(words(&asm, 0, 4), vec![0x1002, 2, 0x0801, 0x55]);
    // Pass B rebinds the label at its real address.
    assert_eq!(asm.symbols.get("target"), Some(3));
    assert_eq!(listing[2].addr, 3);
}

#[test]
fn exact_sizing_counts_one_operand_forms() {
    let src = "\
        mov r2, r0, target
        ror r1
target: WORD 0x55
";
    let (asm, _) = run_with_listing(src, SizingMode::Exact);
    assert_eq!(words(&asm, 0, 4), vec![0x1002, 3, 0x0801, 0x55]);
    assert_eq!(asm.symbols.get("target"), Some(3));
}

#[test]
fn macro_expands_before_processing() {
    let src = "\
MACRO double(a, b)
mov a,b
ENDMACRO
double(r1,r2)
";
    let (asm, listing) = run_with_listing(src, SizingMode::Compatible);
    let emitted: Vec<_> = listing.iter().filter(|l| !l.words.is_empty()).collect();
    assert_eq!(emitted.len(), 1);
    assert_eq!(emitted[0].text, "mov r1,r2");
    assert_eq!(emitted[0].number, 4);
    assert_eq!(asm.image.read(0), 0x0021);
}

#[test]
fn macro_with_label_binds_first_expanded_word() {
    let src = "\
MACRO push(reg, sp)
    sto reg, sp
    sub sp, r0, 1
ENDMACRO
        mov r0, r0
here:   push(r3, r14)
        mov pc, r0, here
";
    let asm = run(src);
    assert_eq!(asm.symbols.get("here"), Some(1));
    assert_eq!(words(&asm, 1, 3), vec![0x06E3, 0x1A0E, 1]);
    assert_eq!(asm.image.read(5), 1);
}

#[test]
fn listing_has_a_record_per_line() {
    let src = "# header\n\nstart: mov r1, r2 # copy\n";
    let (_, listing) = run_with_listing(src, SizingMode::Compatible);
    assert_eq!(listing.len(), 3);
    assert_eq!(listing[2].words, vec![0x0021]);
    assert_eq!(listing[2].text, "start: mov r1, r2 # copy");
}

#[test]
fn undefined_symbol_aborts() {
    let err = assemble("mov r1, r0, nowhere\n", AsmConfig::default()).unwrap_err();
    match err {
        AsmError::Eval { line, source, .. } => {
            assert_eq!(line, 1);
            assert_eq!(source, EvalError::UnknownSymbol("nowhere".into()));
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn image_is_always_full_size() {
    let asm = run("WORD 1\n");
    assert_eq!(asm.image.words().len(), 65536);
    assert!(asm.image.words()[1..].iter().all(|&w| w == 0));
}

#[test]
fn registers_cannot_be_rebound() {
    let asm = run("EQU r1, 9\npc EQU 3\nmov r1, pc\n");
    assert_eq!(asm.symbols.get("r1"), Some(1));
    assert_eq!(asm.image.read(0), 0x00F1);
    assert_eq!(asm.symbols.user_symbols().count(), 0);
}
