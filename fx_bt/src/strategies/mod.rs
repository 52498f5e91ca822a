pub mod buy_and_hold;
