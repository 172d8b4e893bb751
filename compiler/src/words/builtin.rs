//! Built-in word datasets.

type Row = (&'static str, &'static str, &'static str, &'static [&'static str]);

pub(super) const DATASETS: &[(&str, &[Row])] = &[
    ("animals", ANIMALS),
    ("colors", COLORS),
    ("fruits", FRUITS),
    ("verbs", VERBS),
    ("jobs", JOBS),
];

/// Synonym → dataset or category name.
pub(super) const ALIASES: &[(&str, &str)] = &[
    ("animal", "animals"),
    ("pets", "animals"),
    ("creatures", "animals"),
    ("color", "colors"),
    ("colour", "colors"),
    ("colours", "colors"),
    ("fruit", "fruits"),
    ("verb", "verbs"),
    ("actions", "verbs"),
    ("job", "jobs"),
    ("professions", "jobs"),
    ("occupations", "jobs"),
    ("mammal", "mammals"),
    ("bird", "birds"),
    ("insect", "insects"),
    ("berry", "berries"),
];

const ANIMALS: &[Row] = &[
    ("cat", "mammals", "A1", &["pets", "home"]),
    ("dog", "mammals", "A1", &["pets", "home"]),
    ("cow", "mammals", "A1", &["farm"]),
    ("horse", "mammals", "A1", &["farm"]),
    ("pig", "mammals", "A1", &["farm"]),
    ("sheep", "mammals", "A2", &["farm"]),
    ("rabbit", "mammals", "A2", &["pets"]),
    ("elephant", "mammals", "A2", &["wild"]),
    ("giraffe", "mammals", "B1", &["wild"]),
    ("squirrel", "mammals", "B1", &["wild"]),
    ("hedgehog", "mammals", "B2", &["wild"]),
    ("duck", "birds", "A1", &["farm"]),
    ("chicken", "birds", "A1", &["farm"]),
    ("parrot", "birds", "A2", &["pets"]),
    ("owl", "birds", "B1", &["wild"]),
    ("eagle", "birds", "B1", &["wild"]),
    ("fish", "fish", "A1", &["pets", "water"]),
    ("shark", "fish", "A2", &["wild", "water"]),
    ("salmon", "fish", "B1", &["water"]),
    ("bee", "insects", "A2", &["garden"]),
    ("butterfly", "insects", "A2", &["garden"]),
    ("ant", "insects", "A2", &["garden"]),
    ("ladybird", "insects", "B2", &["garden"]),
    ("dragonfly", "insects", "C1", &["water"]),
];

const COLORS: &[Row] = &[
    ("red", "colors", "A1", &["basic", "warm"]),
    ("blue", "colors", "A1", &["basic", "cool"]),
    ("green", "colors", "A1", &["basic", "cool"]),
    ("yellow", "colors", "A1", &["basic", "warm"]),
    ("black", "colors", "A1", &["basic"]),
    ("white", "colors", "A1", &["basic"]),
    ("orange", "colors", "A1", &["warm"]),
    ("pink", "colors", "A1", &["warm"]),
    ("purple", "colors", "A2", &["cool"]),
    ("brown", "colors", "A2", &["warm"]),
    ("grey", "colors", "A2", &["neutral"]),
    ("turquoise", "colors", "B2", &["cool"]),
    ("beige", "colors", "B2", &["neutral"]),
    ("crimson", "colors", "C1", &["warm"]),
];

const FRUITS: &[Row] = &[
    ("apple", "fruit", "A1", &["food"]),
    ("banana", "fruit", "A1", &["food", "tropical"]),
    ("pear", "fruit", "A1", &["food"]),
    ("grape", "fruit", "A2", &["food"]),
    ("peach", "fruit", "A2", &["food"]),
    ("mango", "fruit", "A2", &["food", "tropical"]),
    ("pineapple", "fruit", "A2", &["food", "tropical"]),
    ("orange", "citrus", "A1", &["food"]),
    ("lemon", "citrus", "A1", &["food"]),
    ("lime", "citrus", "B1", &["food"]),
    ("grapefruit", "citrus", "B1", &["food"]),
    ("strawberry", "berries", "A1", &["food", "summer"]),
    ("raspberry", "berries", "B1", &["food", "summer"]),
    ("blueberry", "berries", "B1", &["food", "summer"]),
    ("gooseberry", "berries", "C1", &["food"]),
];

const VERBS: &[Row] = &[
    ("run", "movement", "A1", &["sport"]),
    ("walk", "movement", "A1", &[]),
    ("swim", "movement", "A1", &["sport"]),
    ("jump", "movement", "A1", &["sport"]),
    ("climb", "movement", "A2", &["sport"]),
    ("wander", "movement", "B2", &[]),
    ("say", "communication", "A1", &["irregular"]),
    ("speak", "communication", "A1", &["irregular"]),
    ("ask", "communication", "A1", &[]),
    ("explain", "communication", "A2", &[]),
    ("whisper", "communication", "B1", &[]),
    ("persuade", "communication", "B2", &[]),
    ("eat", "daily-routine", "A1", &["irregular"]),
    ("sleep", "daily-routine", "A1", &["irregular"]),
    ("cook", "daily-routine", "A1", &["kitchen"]),
    ("wash", "daily-routine", "A1", &[]),
    ("commute", "daily-routine", "B2", &["work"]),
];

const JOBS: &[Row] = &[
    ("doctor", "health", "A1", &["hospital"]),
    ("nurse", "health", "A1", &["hospital"]),
    ("dentist", "health", "A2", &[]),
    ("surgeon", "health", "B2", &["hospital"]),
    ("teacher", "education", "A1", &["school"]),
    ("student", "education", "A1", &["school"]),
    ("librarian", "education", "B1", &["school"]),
    ("lecturer", "education", "C1", &["university"]),
    ("cook", "services", "A1", &["kitchen"]),
    ("waiter", "services", "A1", &["restaurant"]),
    ("driver", "services", "A1", &[]),
    ("police officer", "services", "A2", &[]),
    ("firefighter", "services", "A2", &[]),
    ("plumber", "services", "B1", &["trade"]),
    ("electrician", "services", "B1", &["trade"]),
    ("accountant", "services", "B2", &["office"]),
];
