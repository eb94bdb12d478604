//! Ordered phrase tables. Earlier entries win.

pub(super) type PhraseTable = &'static [(&'static str, &'static str)];

pub(super) const COMPOUND_SETTINGS: PhraseTable = &[
    ("throne room", "ornate throne room with golden decorations"),
    ("dungeon cell", "dark stone dungeon with iron bars"),
    ("ancient temple", "mystical ancient temple with glowing runes"),
    ("dark forest", "dark forest with twisted ancient trees"),
    ("enchanted forest", "magical forest with glowing mushrooms"),
    ("castle hall", "grand castle hall with tapestries"),
    ("village square", "medieval village square with market stalls"),
    ("mountain path", "treacherous mountain path with cliff edges"),
    ("desert ruins", "ancient desert ruins half-buried in sand"),
    ("ocean cliff", "dramatic cliff overlooking stormy ocean"),
    ("crystal cave", "cave filled with luminescent crystals"),
    ("royal garden", "elaborate royal garden with fountains"),
    ("battlefield", "chaotic battlefield with smoke and banners"),
    ("wizard tower", "tall wizard tower with magical energy"),
    ("underground chamber", "mysterious underground chamber with torches"),
];

pub(super) const SETTINGS: PhraseTable = &[
    ("forest", "dense forest with towering trees"),
    ("castle", "medieval stone castle"),
    ("city", "bustling medieval city"),
    ("dungeon", "dark stone dungeon"),
    ("mountain", "majestic mountain landscape"),
    ("desert", "vast desert with sand dunes"),
    ("ocean", "vast ocean with rolling waves"),
    ("cave", "mysterious cave with rock formations"),
    ("temple", "ancient temple with stone pillars"),
    ("palace", "ornate royal palace"),
    ("tower", "tall stone tower"),
    ("bridge", "stone bridge over water"),
    ("garden", "beautiful garden with flowers"),
    ("library", "grand library with countless books"),
];

pub(super) const ACTIONS: PhraseTable = &[
    // combat
    ("fighting", "engaged in fierce combat"),
    ("attacking", "launching a powerful attack"),
    ("defending", "in defensive combat stance"),
    ("wielding", "wielding weapon with determination"),
    // movement
    ("running", "running with urgent purpose"),
    ("walking", "walking cautiously forward"),
    ("climbing", "climbing with focused effort"),
    ("flying", "soaring through the air"),
    ("falling", "falling through space"),
    ("jumping", "leaping with athletic grace"),
    // magic
    ("casting", "casting spell with glowing magical energy"),
    ("summoning", "summoning magical forces"),
    ("enchanting", "weaving magical enchantments"),
    // social
    ("talking", "in conversation with others"),
    ("arguing", "in heated discussion"),
    ("negotiating", "engaged in tense negotiation"),
    ("pleading", "making desperate plea"),
    // investigation
    ("searching", "carefully searching the area"),
    ("examining", "closely examining something important"),
    ("discovering", "making shocking discovery"),
    ("reading", "reading ancient text intently"),
    // emotion
    ("crying", "overwhelmed with emotion"),
    ("laughing", "filled with joy and laughter"),
    ("praying", "in solemn prayer"),
    ("meditating", "in peaceful meditation"),
];

pub(super) const MOODS: PhraseTable = &[
    ("danger", "dangerous and tense atmosphere"),
    ("threat", "threatening and ominous mood"),
    ("fear", "fearful and suspenseful atmosphere"),
    ("terror", "terrifying and dark mood"),
    ("mystery", "mysterious and enigmatic atmosphere"),
    ("secret", "secretive and hidden mood"),
    ("ancient", "ancient and mystical atmosphere"),
    ("magical", "magical energy crackling in the air"),
    ("enchanted", "enchanted and otherworldly mood"),
    ("mystical", "mystical and ethereal atmosphere"),
    ("peaceful", "serene and peaceful atmosphere"),
    ("joyful", "bright and joyful mood"),
    ("sad", "melancholic and somber atmosphere"),
    ("angry", "intense and heated atmosphere"),
    ("hopeful", "hopeful and uplifting mood"),
    ("dark", "dark and shadowy atmosphere"),
    ("bright", "bright and illuminated mood"),
    ("glowing", "ethereal glow filling the scene"),
    ("golden", "warm golden light atmosphere"),
];

pub(super) const ELEMENTS: PhraseTable = &[
    // creatures
    ("dragon", "massive dragon with detailed scales"),
    ("wizard", "powerful wizard in flowing robes"),
    ("knight", "armored knight with gleaming armor"),
    ("princess", "elegant princess in royal attire"),
    ("demon", "fearsome demon with dark energy"),
    ("angel", "radiant angel with white wings"),
    ("monster", "terrifying monster with sharp claws"),
    ("ghost", "ethereal ghost with translucent form"),
    // weapons
    ("sword", "legendary sword with intricate design"),
    ("staff", "magical staff glowing with power"),
    ("bow", "elegant elven bow with arrows"),
    ("shield", "protective shield with emblems"),
    ("dagger", "sharp dagger gleaming in light"),
    // artifacts
    ("crystal", "glowing magical crystal"),
    ("potion", "bubbling magical potion"),
    ("scroll", "ancient scroll with mystical runes"),
    ("book", "leather-bound spellbook"),
    ("ring", "magical ring with gems"),
    ("crown", "jeweled royal crown"),
    ("amulet", "protective amulet glowing softly"),
    // environment
    ("fire", "roaring flames casting dancing shadows"),
    ("water", "flowing water with reflective surface"),
    ("lightning", "crackling lightning energy"),
    ("portal", "swirling interdimensional portal"),
    ("door", "ornate door with intricate carvings"),
    ("window", "stained glass window with colored light"),
];

pub(super) const TIME_WEATHER: PhraseTable = &[
    ("dawn", "dawn light breaking over horizon"),
    ("morning", "bright morning sunlight"),
    ("noon", "bright midday sun overhead"),
    ("afternoon", "warm afternoon golden light"),
    ("evening", "soft evening twilight"),
    ("night", "dark night with moonlight"),
    ("midnight", "mysterious midnight atmosphere"),
    ("rain", "heavy rain creating atmosphere"),
    ("storm", "dramatic storm with lightning"),
    ("snow", "falling snow creating winter scene"),
    ("fog", "mysterious fog rolling through"),
    ("wind", "strong wind affecting the scene"),
    ("sunshine", "bright warm sunshine"),
    ("cloudy", "overcast cloudy sky"),
];
