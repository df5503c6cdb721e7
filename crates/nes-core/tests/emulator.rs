mod common;

use common::*;
use nes_core::prelude::*;

/// Steps past the boot vblank waits into the rendering main loop
const WARMUP_FRAMES: usize = 6;

fn booted(headless: bool) -> Emulator {
    let mut emulator = Emulator::from_bytes(&test_rom(), headless).unwrap();
    for _ in 0..WARMUP_FRAMES {
        emulator.step();
    }
    emulator
}

fn pixel(emulator: &Emulator, x: usize, y: usize) -> u32 {
    emulator.screen()[y * SCREEN_WIDTH + x]
}

#[test]
fn test_dimensions() {
    let emulator = Emulator::from_bytes(&test_rom(), false).unwrap();
    assert_eq!((emulator.width(), emulator.height()), (256, 240));
    assert_eq!(emulator.screen().len(), 256 * 240);
    assert_eq!(emulator.memory().len(), 0x800);
}

#[test]
fn test_step_advances_one_frame_of_cycles() {
    let mut emulator = Emulator::from_bytes(&test_rom(), false).unwrap();
    for _ in 0..3 {
        let cycles = emulator.cpu_cycles();
        let dots = emulator.ppu_dots();
        emulator.step();
        assert_eq!(emulator.cpu_cycles() - cycles, CYCLES_PER_FRAME as u64);
        assert_eq!(
            emulator.ppu_dots() - dots,
            (CYCLES_PER_FRAME * DOTS_PER_CYCLE) as u64
        );
    }
}

#[test]
fn test_nmi_fires_once_per_frame() {
    let mut emulator = booted(true);
    let count = emulator.memory()[NMI_COUNTER];
    assert!(count > 0, "NMI handler never ran");

    for expected in 1..=4u8 {
        emulator.step();
        assert_eq!(emulator.memory()[NMI_COUNTER], count.wrapping_add(expected));
    }
}

#[test]
fn test_full_pipeline_draws_background_and_sprite() {
    let emulator = booted(false);

    // first nametable row holds the solid tile
    assert_eq!(pixel(&emulator, 100, 4), NES_SYSTEM_PALETTE[TILE_COLOR as usize]);
    assert_eq!(pixel(&emulator, 100, 20), NES_SYSTEM_PALETTE[BACKDROP_COLOR as usize]);

    // sprite 0 covers rows y+1..=y+8, in front of the background
    let (sprite_y, sprite_x) = SPRITE_ZERO;
    let (x, y) = (sprite_x as usize + 1, sprite_y as usize + 5);
    assert_eq!(pixel(&emulator, x, y), NES_SYSTEM_PALETTE[SPRITE_COLOR as usize]);
    assert_eq!(pixel(&emulator, x, sprite_y as usize), NES_SYSTEM_PALETTE[TILE_COLOR as usize]);
}

#[test]
fn test_light_pipeline_leaves_screen_black() {
    let emulator = booted(true);
    assert!(emulator.screen().iter().all(|&pixel| pixel == 0));
    assert!(emulator.memory()[NMI_COUNTER] > 0);
}

#[test]
fn test_light_and_full_pipelines_agree_on_state() {
    let mut full = booted(false);
    let mut light = booted(true);
    for _ in 0..5 {
        full.step();
        light.step();
        assert_eq!(full.memory(), light.memory());
        assert_eq!(full.serialize(), light.serialize());
    }
}

#[test]
fn test_controller_input_reaches_the_program() {
    let mut emulator = booted(true);
    assert_eq!(emulator.memory()[BUTTON_A_STATE], 0);

    *emulator.controller(0).unwrap() = JoypadButtons::BUTTON_A.bits();
    emulator.step();
    assert_eq!(emulator.memory()[BUTTON_A_STATE], 1);

    *emulator.controller(0).unwrap() = JoypadButtons::START.bits();
    emulator.step();
    assert_eq!(emulator.memory()[BUTTON_A_STATE], 0);

    assert!(emulator.controller(1).is_some());
    assert!(emulator.controller(2).is_none());
}

#[test]
fn test_serialize_round_trip_runs_identically() {
    let mut original = booted(false);
    *original.controller(0).unwrap() = JoypadButtons::BUTTON_A.bits();
    original.step();

    let state = original.serialize();
    let mut copy = Emulator::from_bytes(&test_rom(), false).unwrap();
    copy.deserialize(&state);
    *copy.controller(0).unwrap() = JoypadButtons::BUTTON_A.bits();
    assert_eq!(copy.serialize(), state);

    for frame in 0..10 {
        original.step();
        copy.step();
        assert_eq!(original.memory(), copy.memory(), "RAM differs at frame {frame}");
        assert!(original.screen() == copy.screen(), "screen differs at frame {frame}");
        assert_eq!(original.cpu_cycles(), copy.cpu_cycles());
    }
}

#[test]
#[should_panic(expected = "state buffer truncated")]
fn test_deserialize_truncated_buffer_panics() {
    let mut emulator = booted(true);
    let state = emulator.serialize();
    emulator.deserialize(&state[..state.len() / 2]);
}

#[test]
fn test_backup_restore_returns_to_checkpoint() {
    let mut emulator = booted(false);
    emulator.backup();
    let checkpoint = emulator.serialize();
    let memory = emulator.memory().to_vec();

    for _ in 0..3 {
        emulator.step();
    }
    assert_ne!(emulator.memory(), memory.as_slice());

    emulator.restore();
    assert_eq!(emulator.memory(), memory.as_slice());
    assert_eq!(emulator.serialize(), checkpoint);

    // the snapshot survives a restore and can be used again
    emulator.step();
    emulator.restore();
    assert_eq!(emulator.serialize(), checkpoint);
}

#[test]
fn test_backup_replaces_previous_snapshot() {
    let mut emulator = booted(true);
    emulator.backup();
    emulator.step();
    emulator.backup();
    let second = emulator.serialize();

    emulator.step();
    emulator.restore();
    assert_eq!(emulator.serialize(), second);
}

#[test]
fn test_restore_without_backup_is_a_no_op() {
    let mut emulator = booted(true);
    assert!(!emulator.has_backup());
    let before = emulator.serialize();
    emulator.restore();
    assert_eq!(emulator.serialize(), before);
}

#[test]
fn test_saved_state_handles() {
    let mut emulator = booted(true);
    let saved = emulator.save_state();
    let expected = emulator.serialize();

    emulator.step();
    emulator.step();
    emulator.load_state(&saved);
    assert_eq!(emulator.serialize(), expected);

    // callbacks are live again after loading
    let count = emulator.memory()[NMI_COUNTER];
    emulator.step();
    assert_eq!(emulator.memory()[NMI_COUNTER], count.wrapping_add(1));
}

#[test]
fn test_reset_keeps_ram_and_restarts_cpu() {
    let mut emulator = booted(true);
    let count = emulator.memory()[NMI_COUNTER];

    emulator.reset();
    assert_eq!(emulator.cpu().program_counter, 0x8000);
    assert_eq!(emulator.cpu_cycles(), 0);
    assert_eq!(emulator.ppu_dots(), 0);
    assert_eq!(emulator.memory()[NMI_COUNTER], count);

    // the program boots again and resumes counting frames
    for _ in 0..WARMUP_FRAMES {
        emulator.step();
    }
    assert!(emulator.memory()[NMI_COUNTER] != count);
}

#[test]
fn test_memory_is_writable() {
    let mut emulator = booted(true);
    emulator.memory_mut()[0x0300] = 0xAB;
    emulator.step();
    assert_eq!(emulator.memory()[0x0300], 0xAB);
}

#[test]
fn test_unsupported_mapper_is_rejected() {
    let result = Emulator::from_bytes(&test_rom_with_mapper(4), true);
    assert!(matches!(
        result,
        Err(EmulatorError::Mapper(MapperError::UnsupportedMapper(4)))
    ));
}

#[test]
fn test_invalid_image_is_rejected() {
    let result = Emulator::from_bytes(b"not a rom", false);
    assert!(matches!(result, Err(EmulatorError::Rom(_))));

    let result = Emulator::from_file("/nonexistent/game.nes", false);
    assert!(matches!(result, Err(EmulatorError::Rom(RomError::Io(_)))));
}

#[test]
fn test_state_loads_keep_memory_and_screen_in_place() {
    let mut emulator = booted(false);
    let memory = emulator.memory_mut().as_mut_ptr();
    let screen = emulator.screen().as_ptr();

    emulator.backup();
    emulator.step();
    emulator.restore();
    assert_eq!(emulator.memory_mut().as_mut_ptr(), memory);
    assert_eq!(emulator.screen().as_ptr(), screen);

    let saved = emulator.save_state();
    emulator.step();
    emulator.load_state(&saved);
    assert_eq!(emulator.memory_mut().as_mut_ptr(), memory);
    assert_eq!(emulator.screen().as_ptr(), screen);

    let state = emulator.serialize();
    emulator.step();
    emulator.deserialize(&state);
    assert_eq!(emulator.memory_mut().as_mut_ptr(), memory);
    assert_eq!(emulator.screen().as_ptr(), screen);

    // a write through the old view is what the program sees
    unsafe { *memory.add(0x0300) = 0x5A };
    emulator.step();
    assert_eq!(emulator.memory()[0x0300], 0x5A);
}

fn booted_ux_rom() -> Emulator {
    let mut emulator = Emulator::from_bytes(&ux_rom_test_rom(), true).unwrap();
    for _ in 0..WARMUP_FRAMES {
        emulator.step();
    }
    emulator
}

/// Has the program select `bank` and runs a frame so the write lands
fn select_bank(emulator: &mut Emulator, bank: u8) {
    emulator.memory_mut()[BANK_SELECT] = bank;
    emulator.step();
    assert_eq!(emulator.mapper().read_prg(0x8000), bank);
}

#[test]
fn test_ux_rom_bank_switching_from_the_fixed_bank() {
    let mut emulator = booted_ux_rom();
    assert_eq!(emulator.mapper().id(), 2);
    assert_eq!(emulator.mapper().read_prg(0x8000), 0);

    for bank in 1..SWITCHABLE_BANKS {
        select_bank(&mut emulator, bank);
        assert_eq!(emulator.mapper().read_prg(0xBFFF), bank);
    }
    // $C000 stays on the program bank
    assert_eq!(emulator.mapper().read_prg(0xC000), 0x78);
    assert!(emulator.memory()[NMI_COUNTER] > 0);
}

#[test]
fn test_backup_restores_the_selected_bank() {
    let mut emulator = booted_ux_rom();
    select_bank(&mut emulator, 1);
    emulator.backup();

    select_bank(&mut emulator, 2);
    emulator.restore();
    assert_eq!(emulator.mapper().read_prg(0x8000), 1);
    assert_eq!(emulator.mapper().read_prg(0xBFFF), 1);
    assert_eq!(emulator.mapper().read_prg(0xC000), 0x78);

    // the restored program keeps selecting the restored bank
    emulator.step();
    assert_eq!(emulator.mapper().read_prg(0x8000), 1);
}

#[test]
fn test_serialized_state_carries_the_selected_bank() {
    let mut emulator = booted_ux_rom();
    select_bank(&mut emulator, 1);
    let state = emulator.serialize();

    select_bank(&mut emulator, 2);
    emulator.deserialize(&state);
    assert_eq!(emulator.mapper().read_prg(0x8000), 1);
    assert_eq!(emulator.serialize(), state);

    let mut copy = Emulator::from_bytes(&ux_rom_test_rom(), true).unwrap();
    assert_eq!(copy.mapper().read_prg(0x8000), 0);
    copy.deserialize(&state);
    assert_eq!(copy.mapper().read_prg(0x8000), 1);

    emulator.step();
    copy.step();
    assert_eq!(copy.serialize(), emulator.serialize());
}
