use mirajazz::{error::MirajazzError, types::DeviceInput};

/// N1 key count (15 buttons + 3 top LCDs)
const N1_KEY_COUNT: usize = 18;

/// Process raw input from N1 device.
/// Device inputs 1-15 (main grid) map to logical keys 0-14,
/// device inputs 16-18 (top LCDs) map to logical keys 15-17.
/// Inputs 30, 31 (undisplayed buttons) and encoder inputs are ignored.
pub fn process_input_n1(input: u8, state: u8) -> Result<DeviceInput, MirajazzError> {
    log::debug!("Processing N1 input: {}, {}", input, state);

    match input as usize {
        0..=N1_KEY_COUNT => read_button_press_n1(input, state),
        _ => {
            log::debug!("Ignoring N1 input {}", input);
            Ok(DeviceInput::ButtonStateChange(vec![false; N1_KEY_COUNT]))
        }
    }
}

/// Converts logical key index to the index sent with images.
/// The device adds 1 to every index it receives, which is exactly
/// the offset between logical keys and device inputs.
///
///   Logical grid:          Device inputs:
///   [0]  [1]  [2]          [1]  [2]  [3]
///   [3]  [4]  [5]          [4]  [5]  [6]
///   ...                    ...
///   [12] [13] [14]         [13] [14] [15]
///   LCDs [15] [16] [17]    [16] [17] [18]
pub fn logical_to_device(key: u8) -> u8 {
    key
}

/// Converts N1 device input to logical key index
fn device_to_logical(input: usize) -> usize {
    input.saturating_sub(1)
}

fn read_button_press_n1(input: u8, state: u8) -> Result<DeviceInput, MirajazzError> {
    let mut button_states = vec![false; N1_KEY_COUNT];

    if input == 0 {
        return Ok(DeviceInput::ButtonStateChange(button_states));
    }

    let pressed_index = device_to_logical(input as usize);

    if pressed_index < N1_KEY_COUNT {
        button_states[pressed_index] = state != 0;
    }

    Ok(DeviceInput::ButtonStateChange(button_states))
}
